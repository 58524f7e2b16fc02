//! Turns clicks and history traversals into navigations.
//!
//! The host forwards DOM events here and honours the returned outcome: when
//! it reports the default as prevented, the browser must not follow the link.
//! Navigations are spawned with [`tokio::task::spawn_local`], so both handlers
//! must be called from inside a [`tokio::task::LocalSet`].

use std::rc::Rc;

use html::NodeId;
use log::{debug, warn};
use tokio::task::{JoinHandle, spawn_local};

use crate::config::TRANSITION_ATTR;
use crate::error::NavigationError;
use crate::location::Location;
use crate::navigator::Navigator;
use crate::transition::Trigger;

pub type NavigationHandle = JoinHandle<Result<(), NavigationError>>;

/// A primary-button click on `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: NodeId,
    pub meta_key: bool,
    pub ctrl_key: bool,
}

impl ClickEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            meta_key: false,
            ctrl_key: false,
        }
    }
}

#[derive(Debug)]
pub enum ClickOutcome {
    /// The click was not inside an intercepted anchor.
    NotALink,
    /// Let the browser handle the click (modifier held, other host, or in-page hash jump).
    Ignored,
    /// Suppress the browser default without navigating (link to the page already shown).
    PreventDefault,
    /// Default suppressed and a navigation started.
    Navigating(NavigationHandle),
}

impl ClickOutcome {
    pub fn default_prevented(&self) -> bool {
        matches!(self, Self::PreventDefault | Self::Navigating(_))
    }
}

#[derive(Debug)]
pub enum PopstateOutcome {
    /// Same pathname while nothing owns history, such as a hash change.
    Ignored,
    /// A navigation is running; history was rewritten back to the pop target.
    Vetoed,
    Navigating(NavigationHandle),
}

/// Delegated click and popstate handling for one navigator.
pub struct LinkInterceptor {
    navigator: Rc<Navigator>,
}

impl LinkInterceptor {
    pub fn new(navigator: Rc<Navigator>) -> Self {
        Self { navigator }
    }

    pub fn navigator(&self) -> &Rc<Navigator> {
        &self.navigator
    }

    pub fn on_click(&self, click: &ClickEvent) -> ClickOutcome {
        if click.meta_key || click.ctrl_key {
            return ClickOutcome::Ignored;
        }
        let (anchor, href, transition) = {
            let document = self.navigator.document().borrow();
            let Some(anchor) = document.closest(click.target, self.navigator.links()) else {
                return ClickOutcome::NotALink;
            };
            let Some(href) = document.attr(anchor, "href") else {
                return ClickOutcome::Ignored;
            };
            (
                anchor,
                href.to_owned(),
                document.attr(anchor, TRANSITION_ATTR).map(str::to_owned),
            )
        };

        let current = match self.navigator.sync_current_location() {
            Ok(current) => current,
            Err(err) => {
                warn!("Ignoring click: {err}");
                return ClickOutcome::Ignored;
            }
        };
        let target = match Location::parse(&href, current.url().as_str()) {
            Ok(target) => target,
            Err(err) => {
                warn!("Ignoring click: {err}");
                return ClickOutcome::Ignored;
            }
        };
        if target.host != current.host {
            return ClickOutcome::Ignored;
        }

        if current.href != target.href || (current.has_hash && !target.has_hash) {
            debug!("Intercepted click to {}", target.href);
            return ClickOutcome::Navigating(self.spawn(href, transition, Trigger::Link(anchor)));
        }
        if !current.has_hash && !target.has_hash {
            return ClickOutcome::PreventDefault;
        }
        ClickOutcome::Ignored
    }

    /// Handle a popstate; the window location already shows the popped entry.
    pub fn on_popstate(&self) -> PopstateOutcome {
        let href = self.navigator.window_href();
        let location = match self.navigator.resolve(&href) {
            Ok(location) => location,
            Err(err) => {
                warn!("Ignoring popstate: {err}");
                return PopstateOutcome::Ignored;
            }
        };

        let vetoed_target = {
            let mut state = self.navigator.state.borrow_mut();
            if location.pathname == state.current_location.pathname && !state.pop_authoritative {
                return PopstateOutcome::Ignored;
            }
            if !self.navigator.options().allow_interruption
                && (state.is_transitioning() || state.pop_authoritative)
            {
                Some(state.pop_target.clone())
            } else {
                if !state.pop_authoritative {
                    state.pop_target.clone_from(&href);
                }
                state.pop_authoritative = true;
                None
            }
        };

        if let Some(pop_target) = vetoed_target {
            self.navigator.window().borrow_mut().push_state(&pop_target);
            warn!("Popstate to {href} vetoed: {}", NavigationError::InProgress);
            return PopstateOutcome::Vetoed;
        }
        PopstateOutcome::Navigating(self.spawn(href, None, Trigger::Popstate))
    }

    fn spawn(&self, url: String, transition: Option<String>, trigger: Trigger) -> NavigationHandle {
        let navigator = Rc::clone(&self.navigator);
        spawn_local(async move {
            let result = navigator
                .navigate_to(&url, transition.as_deref(), trigger)
                .await;
            if let Err(err) = &result {
                warn!("Navigation to {url} failed: {err}");
            }
            result
        })
    }
}
