//! Transition strategies: the animation hooks run while a view leaves and enters.

use futures::future::{AbortHandle, LocalBoxFuture};
use html::NodeId;

use crate::window::SharedDocument;

/// What started a navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// `navigate_to` called by the host.
    Programmatic,
    /// A click on the given anchor in the live document.
    Link(NodeId),
    /// A history traversal.
    Popstate,
}

/// Lets long-running transition work notice that its navigation was superseded.
///
/// The navigator drops a superseded navigation at its next await point, so a
/// transition only needs to poll this if it holds external resources.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    handle: AbortHandle,
}

impl CancelSignal {
    pub(crate) fn new(handle: AbortHandle) -> Self {
        Self { handle }
    }

    /// A signal that is never cancelled.
    pub fn detached() -> Self {
        Self::new(AbortHandle::new_pair().0)
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }
}

/// Handed to transition factories when a transition is instantiated.
#[derive(Clone)]
pub struct TransitionContext {
    pub document: SharedDocument,
    pub wrapper: NodeId,
}

/// Arguments for one leave or enter phase.
#[derive(Clone, Copy)]
pub struct TransitionArgs<'a> {
    /// View root being animated out (leave) or in (enter), if it is in the live document
    pub node: Option<NodeId>,
    pub wrapper: NodeId,
    pub trigger: &'a Trigger,
    pub signal: &'a CancelSignal,
}

/// An animation strategy. Both phases resolve once the animation has finished.
pub trait Transition {
    fn leave<'a>(&'a self, args: TransitionArgs<'a>) -> LocalBoxFuture<'a, ()>;
    fn enter<'a>(&'a self, args: TransitionArgs<'a>) -> LocalBoxFuture<'a, ()>;
}

/// Completes both phases immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTransition;

impl Transition for DefaultTransition {
    fn leave<'a>(&'a self, _args: TransitionArgs<'a>) -> LocalBoxFuture<'a, ()> {
        Box::pin(async {})
    }

    fn enter<'a>(&'a self, _args: TransitionArgs<'a>) -> LocalBoxFuture<'a, ()> {
        Box::pin(async {})
    }
}
