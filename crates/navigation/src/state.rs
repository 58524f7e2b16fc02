//! Orchestrator state.

use std::rc::Rc;

use futures::future::AbortHandle;

use crate::cache::CacheEntry;
use crate::location::Location;

/// Where the navigator is in the navigation lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavigationPhase {
    #[default]
    Idle,
    /// The outgoing view is leaving while the target page is fetched or staged.
    LeavingAndFetching,
    /// The incoming view is attached and entering.
    Entering,
}

pub(crate) struct NavigatorState {
    pub phase: NavigationPhase,
    /// Set for the whole of a navigation and by an accepted popstate. While set,
    /// `pop_target` is the URL history must show if a popstate is vetoed.
    pub pop_authoritative: bool,
    pub current_location: Location,
    pub target_location: Option<Location>,
    pub pop_target: String,
    pub current_entry: Rc<CacheEntry>,
    /// Abort handle of the running navigation, with its sequence number.
    pub in_flight: Option<(u64, AbortHandle)>,
    pub sequence: u64,
}

impl NavigatorState {
    pub fn new(current_location: Location, current_entry: Rc<CacheEntry>) -> Self {
        Self {
            phase: NavigationPhase::Idle,
            pop_authoritative: false,
            pop_target: current_location.href.clone(),
            current_location,
            target_location: None,
            current_entry,
            in_flight: None,
            sequence: 0,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase != NavigationPhase::Idle
    }

    /// Whether navigation `sequence` is still the one the state belongs to.
    pub fn owns(&self, sequence: u64) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|(running, _)| *running == sequence)
    }

    /// Back to idle after navigation `sequence` finished or failed.
    pub fn settle(&mut self, sequence: u64) {
        if !self.owns(sequence) {
            return;
        }
        self.phase = NavigationPhase::Idle;
        self.pop_authoritative = false;
        self.target_location = None;
        self.in_flight = None;
    }
}
