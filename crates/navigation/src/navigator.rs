//! The navigation orchestrator.
//!
//! A navigation runs in two phases. While the outgoing view leaves, the target
//! page is fetched (or taken from the cache) and staged off-screen. Once both
//! are done the incoming view is attached, scripts are reconciled and the view
//! enters. Only one navigation runs at a time: a second one is rejected, or
//! supersedes the first when interruption is allowed.

use core::cell::RefCell;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable, Aborted, join};
use html::{Document, NodeId, SelectorList, parse_selector_list};
use log::{debug, info, warn};
use tracing::{Instrument as _, info_span};

use crate::cache::{CacheEntry, EntryBuilder, PageCache};
use crate::config::{DEFAULT_NAME, NavigatorOptions, WRAPPER_SELECTOR};
use crate::error::NavigationError;
use crate::events::{EventBus, EventEmitter, EventPayload, ListenerId, NavigationEvent};
use crate::fetch::{FetchFallback, HttpFetcher, PageFetcher, fetch_page};
use crate::location::Location;
use crate::registry::{Registry, RendererFactory, TransitionFactory};
use crate::renderer::TransitionStep;
use crate::routes::{PatternRouteStore, RouteStore};
use crate::scripts::{NullEngine, ReloadJsFilter, SharedEngine, reconcile_scripts};
use crate::state::{NavigationPhase, NavigatorState};
use crate::transition::{CancelSignal, Transition, TransitionContext, Trigger};
use crate::window::{SharedDocument, SharedWindow};

/// Collaborators and options for a [`Navigator`]. Everything but the document
/// and window has a default.
pub struct NavigatorBuilder {
    document: SharedDocument,
    window: SharedWindow,
    options: NavigatorOptions,
    fetcher: Rc<dyn PageFetcher>,
    engine: SharedEngine,
    events: Rc<dyn EventEmitter>,
    renderers: Registry<RendererFactory>,
    transitions: Registry<TransitionFactory>,
    reload_js: Option<ReloadJsFilter>,
    routes: Option<Box<dyn RouteStore>>,
}

impl NavigatorBuilder {
    pub fn new(document: SharedDocument, window: SharedWindow) -> Self {
        Self {
            document,
            window,
            options: NavigatorOptions::default(),
            fetcher: Rc::new(HttpFetcher::default()),
            engine: Rc::new(RefCell::new(NullEngine)),
            events: Rc::new(EventBus::new()),
            renderers: Registry::default(),
            transitions: Registry::default(),
            reload_js: None,
            routes: None,
        }
    }

    #[must_use]
    pub fn options(mut self, options: NavigatorOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: Rc<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: SharedEngine) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn events(mut self, events: Rc<dyn EventEmitter>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn renderers(mut self, renderers: Registry<RendererFactory>) -> Self {
        self.renderers = renderers;
        self
    }

    #[must_use]
    pub fn transitions(mut self, transitions: Registry<TransitionFactory>) -> Self {
        self.transitions = transitions;
        self
    }

    /// Script filter used when `reload_js` is enabled. Defaults to the `data-taxi-reload` marker.
    #[must_use]
    pub fn reload_js_filter(mut self, filter: ReloadJsFilter) -> Self {
        self.reload_js = Some(filter);
        self
    }

    #[must_use]
    pub fn routes(mut self, routes: Box<dyn RouteStore>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Snapshot the current page into the cache and run its renderer's initial load.
    ///
    /// # Errors
    /// Fails if the document has no `[data-taxi]` wrapper, the window URL is not
    /// absolute, or the current page has no usable view root.
    pub fn build(self) -> Result<Rc<Navigator>, NavigationError> {
        let wrapper = self
            .document
            .borrow()
            .query_selector(WRAPPER_SELECTOR)
            .ok_or(NavigationError::MissingWrapper)?;
        let href = self.window.borrow().location_href();
        let current_location = Location::parse(&href, &href)?;
        let reload_js = if self.options.reload_js {
            self.reload_js.unwrap_or_default()
        } else {
            ReloadJsFilter::Disabled
        };

        let snapshot = self.document.borrow().clone();
        let entry = EntryBuilder {
            renderers: &self.renderers,
            default_renderer: DEFAULT_NAME,
            reload_js: &reload_js,
            document: &self.document,
            wrapper,
        }
        .build(&current_location.href, snapshot)?;
        let entry = Rc::new(entry);
        entry.renderer.initial_load();

        let mut cache = PageCache::default();
        cache.insert(current_location.href.clone(), Rc::clone(&entry));
        info!("Navigator ready on {}", current_location.href);

        Ok(Rc::new(Navigator {
            links: parse_selector_list(&self.options.links),
            options: self.options,
            reload_js,
            document: self.document,
            wrapper,
            window: self.window,
            fetcher: self.fetcher,
            engine: self.engine,
            events: self.events,
            renderers: self.renderers,
            transitions: self.transitions,
            default_renderer: RefCell::new(DEFAULT_NAME.to_owned()),
            default_transition: RefCell::new(DEFAULT_NAME.to_owned()),
            routes: RefCell::new(self.routes),
            cache: RefCell::new(cache),
            state: RefCell::new(NavigatorState::new(current_location, entry)),
        }))
    }
}

/// Orchestrates same-origin navigations over a live document.
///
/// All methods take `&self`; the navigator is shared as `Rc<Navigator>` with
/// the link interceptor and runs on a single thread.
pub struct Navigator {
    options: NavigatorOptions,
    links: SelectorList,
    reload_js: ReloadJsFilter,
    document: SharedDocument,
    wrapper: NodeId,
    window: SharedWindow,
    fetcher: Rc<dyn PageFetcher>,
    engine: SharedEngine,
    events: Rc<dyn EventEmitter>,
    renderers: Registry<RendererFactory>,
    transitions: Registry<TransitionFactory>,
    default_renderer: RefCell<String>,
    default_transition: RefCell<String>,
    routes: RefCell<Option<Box<dyn RouteStore>>>,
    cache: RefCell<PageCache>,
    pub(crate) state: RefCell<NavigatorState>,
}

impl Navigator {
    pub fn builder(document: SharedDocument, window: SharedWindow) -> NavigatorBuilder {
        NavigatorBuilder::new(document, window)
    }

    /// Navigate to `url`, resolved against the current window location.
    ///
    /// `transition` names a registered transition and overrides route matching.
    /// Resolves once the incoming view has finished entering.
    ///
    /// # Errors
    /// - [`NavigationError::InProgress`] if a navigation is running and interruption is disallowed
    /// - [`NavigationError::Superseded`] if a newer navigation aborted this one
    /// - [`NavigationError::UnknownTransition`] or [`NavigationError::UnknownRenderer`]
    ///   for names that are not registered
    /// - fetch errors, after the window has been sent to `url` with a full page load
    pub async fn navigate_to(
        &self,
        url: &str,
        transition: Option<&str>,
        trigger: Trigger,
    ) -> Result<(), NavigationError> {
        if self.is_transitioning() && !self.options.allow_interruption {
            warn!("Navigation to {url} rejected: {}", NavigationError::InProgress);
            return Err(NavigationError::InProgress);
        }
        let (target, strategy) = match self.prepare(url, transition) {
            Ok(prepared) => prepared,
            Err(err) => {
                let mut state = self.state.borrow_mut();
                if state.in_flight.is_none() {
                    state.pop_authoritative = false;
                }
                return Err(err);
            }
        };

        let (handle, registration) = AbortHandle::new_pair();
        let sequence = {
            let mut state = self.state.borrow_mut();
            if let Some((previous, previous_handle)) = state.in_flight.take() {
                info!("Navigation #{previous} superseded by {}", target.href);
                previous_handle.abort();
            }
            let sequence = state.sequence.wrapping_add(1);
            state.sequence = sequence;
            state.phase = NavigationPhase::LeavingAndFetching;
            state.pop_authoritative = true;
            state.target_location = Some(target.clone());
            state.pop_target = self.window.borrow().location_href();
            state.in_flight = Some((sequence, handle.clone()));
            sequence
        };

        let href = target.href.clone();
        let span = info_span!("navigate", href = %href, sequence);
        let signal = CancelSignal::new(handle);
        let outcome = Abortable::new(self.run(target, strategy, trigger, signal), registration)
            .instrument(span)
            .await;
        self.state.borrow_mut().settle(sequence);
        match outcome {
            Ok(result) => result,
            Err(Aborted) => {
                debug!("Navigation #{sequence} to {href} was aborted");
                Err(NavigationError::Superseded(href))
            }
        }
    }

    fn prepare(
        &self,
        url: &str,
        transition: Option<&str>,
    ) -> Result<(Location, Box<dyn Transition>), NavigationError> {
        let target = self.resolve(url)?;
        let strategy = self.choose_transition(transition, &target)?;
        Ok((target, strategy))
    }

    async fn run(
        &self,
        target: Location,
        strategy: Box<dyn Transition>,
        trigger: Trigger,
        signal: CancelSignal,
    ) -> Result<(), NavigationError> {
        let from = self.current_entry();
        info!("Navigating to {} ({trigger:?})", target.href);
        self.events.emit(
            NavigationEvent::NavigateOut,
            &EventPayload {
                from: Rc::clone(&from),
                to: None,
                trigger: trigger.clone(),
            },
        );

        let step = TransitionStep {
            transition: &*strategy,
            trigger: &trigger,
            signal: &signal,
        };
        let leave = async {
            from.renderer
                .leave(step, self.options.remove_old_content)
                .await;
            if trigger != Trigger::Popstate {
                self.window.borrow_mut().push_state(target.url().as_str());
            }
        };
        let entry = match self.usable_entry(&target) {
            Some(entry) => {
                debug!("Cache hit for {}", target.href);
                entry.renderer.create_dom();
                leave.await;
                entry
            }
            None => {
                let ((), fetched) = join(leave, self.fetch_entry(&target)).await;
                fetched?
            }
        };

        {
            let mut state = self.state.borrow_mut();
            state.phase = NavigationPhase::Entering;
            state.pop_target = self.window.borrow().location_href();
            state.current_location = target;
        }
        entry.renderer.update();
        self.events.emit(
            NavigationEvent::NavigateIn,
            &EventPayload {
                from: Rc::clone(&from),
                to: Some(Rc::clone(&entry)),
                trigger: trigger.clone(),
            },
        );
        if self.reload_js.is_enabled() {
            reconcile_scripts(
                &self.document,
                &self.engine,
                &self.reload_js,
                &entry.page,
                &entry.scripts,
            );
        }
        entry.renderer.enter(step).await;

        self.events.emit(
            NavigationEvent::NavigateEnd,
            &EventPayload {
                from,
                to: Some(Rc::clone(&entry)),
                trigger,
            },
        );
        self.state.borrow_mut().current_entry = entry;
        Ok(())
    }

    fn usable_entry(&self, target: &Location) -> Option<Rc<CacheEntry>> {
        if self.options.bypass_cache {
            return None;
        }
        self.cache
            .borrow()
            .get(&target.href)
            .filter(|entry| !entry.skip_cache)
    }

    /// Fetch, cache and stage the page at `target`. A page that cannot become a
    /// cache entry is handed to the browser with a full page load.
    async fn fetch_entry(&self, target: &Location) -> Result<Rc<CacheEntry>, NavigationError> {
        let page = fetch_page(
            &*self.fetcher,
            &self.window,
            target.url(),
            FetchFallback::HardNavigate,
        )
        .await?;
        let entry = match self.build_entry(&target.href, page) {
            Ok(entry) => Rc::new(entry),
            Err(err) => {
                warn!("{err}; falling back to a full page load");
                self.window.borrow_mut().hard_navigate(target.url().as_str());
                return Err(err);
            }
        };
        self.cache
            .borrow_mut()
            .insert(target.href.clone(), Rc::clone(&entry));
        entry.renderer.create_dom();
        Ok(entry)
    }

    fn build_entry(&self, href: &str, page: Document) -> Result<CacheEntry, NavigationError> {
        let default_renderer = self.default_renderer.borrow();
        EntryBuilder {
            renderers: &self.renderers,
            default_renderer: &default_renderer,
            reload_js: &self.reload_js,
            document: &self.document,
            wrapper: self.wrapper,
        }
        .build(href, page)
    }

    /// Pick the transition: explicit name, then the route store, then the default.
    fn choose_transition(
        &self,
        requested: Option<&str>,
        target: &Location,
    ) -> Result<Box<dyn Transition>, NavigationError> {
        let name = if let Some(name) = requested.filter(|name| !name.is_empty()) {
            name.to_owned()
        } else {
            let routed = {
                let state = self.state.borrow();
                self.routes
                    .borrow()
                    .as_ref()
                    .and_then(|routes| routes.find_match(&state.current_location, target))
            };
            routed.unwrap_or_else(|| self.default_transition.borrow().clone())
        };
        let Some(factory) = self.transitions.get(&name) else {
            warn!("Transition {name:?} is not registered");
            return Err(NavigationError::UnknownTransition(name));
        };
        Ok(factory(TransitionContext {
            document: Rc::clone(&self.document),
            wrapper: self.wrapper,
        }))
    }

    /// Fetch `url` into the cache without navigating. Already cached URLs are
    /// left untouched. With `with_assets` the view is also staged off-screen.
    ///
    /// # Errors
    /// Returns fetch and entry errors; the window is never touched.
    pub async fn preload(&self, url: &str, with_assets: bool) -> Result<(), NavigationError> {
        let target = self.resolve(url)?;
        if self.cache.borrow().contains(&target.href) {
            debug!("Preload of {} skipped, already cached", target.href);
            return Ok(());
        }
        let page = fetch_page(
            &*self.fetcher,
            &self.window,
            target.url(),
            FetchFallback::Suppress,
        )
        .await?;
        let entry = Rc::new(self.build_entry(&target.href, page)?);
        self.cache
            .borrow_mut()
            .insert(target.href.clone(), Rc::clone(&entry));
        if with_assets {
            entry.renderer.create_dom();
        }
        info!("Preloaded {}", target.href);
        Ok(())
    }

    /// Re-snapshot the live document into the cache under `url`, or under the current location.
    ///
    /// # Errors
    /// Fails if `url` cannot be resolved or the live document has no usable view root.
    pub fn update_cache(&self, url: Option<&str>) -> Result<(), NavigationError> {
        let href = self.cache_key(url)?;
        let snapshot = self.document.borrow().clone();
        let entry = self.build_entry(&href, snapshot)?;
        debug!("Updated cache entry for {href}");
        self.cache.borrow_mut().insert(href, Rc::new(entry));
        Ok(())
    }

    /// Drop the cache entry for `url`, or for the current location.
    ///
    /// # Errors
    /// Fails if `url` cannot be resolved.
    pub fn clear_cache(&self, url: Option<&str>) -> Result<(), NavigationError> {
        let href = self.cache_key(url)?;
        if self.cache.borrow_mut().remove(&href).is_some() {
            debug!("Cleared cache entry for {href}");
        }
        Ok(())
    }

    fn cache_key(&self, url: Option<&str>) -> Result<String, NavigationError> {
        let current = self.window_href();
        Ok(Location::parse(url.unwrap_or(&current), &current)?.href)
    }

    /// Renderer used for view roots that do not name one.
    ///
    /// # Errors
    /// Returns [`NavigationError::UnknownRenderer`] if `name` is not registered.
    pub fn set_default_renderer(&self, name: &str) -> Result<(), NavigationError> {
        if !self.renderers.contains(name) {
            return Err(NavigationError::UnknownRenderer(name.to_owned()));
        }
        name.clone_into(&mut self.default_renderer.borrow_mut());
        Ok(())
    }

    /// Transition used when neither the link nor a route picks one.
    ///
    /// # Errors
    /// Returns [`NavigationError::UnknownTransition`] if `name` is not registered.
    pub fn set_default_transition(&self, name: &str) -> Result<(), NavigationError> {
        if !self.transitions.contains(name) {
            return Err(NavigationError::UnknownTransition(name.to_owned()));
        }
        name.clone_into(&mut self.default_transition.borrow_mut());
        Ok(())
    }

    /// Register a route, creating a [`PatternRouteStore`] on first use.
    ///
    /// # Errors
    /// Returns the store's error for a rejected pattern.
    pub fn add_route(
        &self,
        from_pattern: &str,
        to_pattern: &str,
        transition: &str,
    ) -> Result<(), NavigationError> {
        self.routes
            .borrow_mut()
            .get_or_insert_with(|| -> Box<dyn RouteStore> { Box::new(PatternRouteStore::new()) })
            .add(from_pattern, to_pattern, transition)
    }

    pub fn on(
        &self,
        event: NavigationEvent,
        listener: impl Fn(&EventPayload) + 'static,
    ) -> ListenerId {
        self.events.on(event, Rc::new(listener))
    }

    pub fn off(&self, event: NavigationEvent, listener: Option<ListenerId>) {
        self.events.off(event, listener);
    }

    /// Resolve `url` against the current window location.
    ///
    /// # Errors
    /// Returns [`NavigationError::InvalidUrl`] if it cannot be resolved.
    pub fn resolve(&self, url: &str) -> Result<Location, NavigationError> {
        Location::parse(url, &self.window_href())
    }

    /// Re-read the window location into the current location, as a click does.
    pub(crate) fn sync_current_location(&self) -> Result<Location, NavigationError> {
        let href = self.window_href();
        let location = Location::parse(&href, &href)?;
        self.state.borrow_mut().current_location = location.clone();
        Ok(location)
    }

    pub fn window_href(&self) -> String {
        self.window.borrow().location_href()
    }

    pub fn current_entry(&self) -> Rc<CacheEntry> {
        Rc::clone(&self.state.borrow().current_entry)
    }

    pub fn current_location(&self) -> Location {
        self.state.borrow().current_location.clone()
    }

    pub fn target_location(&self) -> Option<Location> {
        self.state.borrow().target_location.clone()
    }

    pub fn phase(&self) -> NavigationPhase {
        self.state.borrow().phase
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.borrow().is_transitioning()
    }

    /// Whether history is currently owned by a navigation or an accepted popstate.
    pub fn is_popping(&self) -> bool {
        self.state.borrow().pop_authoritative
    }

    pub fn pop_target(&self) -> String {
        self.state.borrow().pop_target.clone()
    }

    pub fn cached(&self, url: &str) -> Option<Rc<CacheEntry>> {
        let href = self.resolve(url).ok()?.href;
        self.cache.borrow().get(&href)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn options(&self) -> &NavigatorOptions {
        &self.options
    }

    /// Parsed form of [`NavigatorOptions::links`].
    pub fn links(&self) -> &SelectorList {
        &self.links
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn window(&self) -> &SharedWindow {
        &self.window
    }

    /// The `[data-taxi]` element of the live document.
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }
}
