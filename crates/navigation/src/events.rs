//! Navigation lifecycle events.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::cache::CacheEntry;
use crate::transition::Trigger;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavigationEvent {
    /// Emitted before the outgoing view starts leaving.
    NavigateOut,
    /// Emitted once the incoming view is attached, before it enters.
    NavigateIn,
    /// Emitted after the incoming view finished entering.
    NavigateEnd,
}

impl NavigationEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NavigateOut => "NAVIGATE_OUT",
            Self::NavigateIn => "NAVIGATE_IN",
            Self::NavigateEnd => "NAVIGATE_END",
        }
    }
}

impl fmt::Display for NavigationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivered to listeners. `to` is `None` for [`NavigationEvent::NavigateOut`].
#[derive(Clone, Debug)]
pub struct EventPayload {
    pub from: Rc<CacheEntry>,
    pub to: Option<Rc<CacheEntry>>,
    pub trigger: Trigger,
}

pub type Listener = Rc<dyn Fn(&EventPayload)>;

/// Handle returned by [`EventEmitter::on`], used to remove a single listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Publish/subscribe seam the navigator emits through.
pub trait EventEmitter {
    fn on(&self, event: NavigationEvent, listener: Listener) -> ListenerId;

    /// Remove one listener, or every listener for `event` when `listener` is `None`.
    fn off(&self, event: NavigationEvent, listener: Option<ListenerId>);

    /// Call every listener registered for `event`, in registration order.
    fn emit(&self, event: NavigationEvent, payload: &EventPayload);
}

/// In-process, synchronous emitter.
///
/// Listeners may register or remove listeners while being called; such changes
/// take effect from the next emit.
#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<NavigationEvent, Vec<(ListenerId, Listener)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self, event: NavigationEvent) -> usize {
        self.listeners.borrow().get(&event).map_or(0, Vec::len)
    }
}

impl EventEmitter for EventBus {
    fn on(&self, event: NavigationEvent, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push((id, listener));
        id
    }

    fn off(&self, event: NavigationEvent, listener: Option<ListenerId>) {
        let mut listeners = self.listeners.borrow_mut();
        match listener {
            Some(id) => {
                if let Some(registered) = listeners.get_mut(&event) {
                    registered.retain(|(existing, _)| *existing != id);
                }
            }
            None => {
                listeners.remove(&event);
            }
        }
    }

    fn emit(&self, event: NavigationEvent, payload: &EventPayload) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .get(&event)
            .map(|registered| {
                registered
                    .iter()
                    .map(|(_, listener)| Rc::clone(listener))
                    .collect()
            })
            .unwrap_or_default();
        trace!("{event} -> {} listeners", snapshot.len());
        for listener in snapshot {
            listener(payload);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut map = f.debug_map();
        for (event, registered) in listeners.iter() {
            map.entry(event, &registered.len());
        }
        map.finish()
    }
}
