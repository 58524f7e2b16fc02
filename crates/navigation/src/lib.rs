//! Same-origin page navigation without full reloads.
//!
//! A [`Navigator`] owns a page cache and swaps the `[data-taxi-view]` element
//! inside the `[data-taxi]` wrapper of a live [`html::Document`]. Renderers
//! stage and attach views, transitions animate them, and a [`LinkInterceptor`]
//! turns clicks and popstates into navigations. Everything runs on one thread;
//! navigations started by the interceptor are spawned onto a
//! [`tokio::task::LocalSet`].
#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Private plumbing is documented where it is not obvious"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining is left to the compiler"
)]

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod interceptor;
pub mod location;
pub mod navigator;
pub mod registry;
pub mod renderer;
pub mod routes;
pub mod scripts;
pub mod state;
pub mod transition;
pub mod window;

pub use cache::{CacheEntry, EntryBuilder, PageCache};
pub use config::NavigatorOptions;
pub use error::NavigationError;
pub use events::{EventBus, EventEmitter, EventPayload, Listener, ListenerId, NavigationEvent};
pub use fetch::{FetchFallback, FetchResponse, HttpFetcher, PageFetcher, fetch_page};
pub use interceptor::{ClickEvent, ClickOutcome, LinkInterceptor, NavigationHandle, PopstateOutcome};
pub use location::Location;
pub use navigator::{Navigator, NavigatorBuilder};
pub use registry::{
    Registry, RendererFactory, TransitionFactory, renderer_factory, transition_factory,
};
pub use renderer::{DefaultRenderer, Renderer, RendererContext, RendererHooks, TransitionStep};
pub use routes::{PatternRouteStore, RouteStore};
pub use scripts::{
    JsEngine, NullEngine, ReloadJsFilter, ScriptReport, SharedEngine, reconcile_scripts,
};
pub use state::NavigationPhase;
pub use transition::{
    CancelSignal, DefaultTransition, Transition, TransitionArgs, TransitionContext, Trigger,
};
pub use window::{BrowserWindow, HeadlessWindow, SharedDocument, SharedWindow};
