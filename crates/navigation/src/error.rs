//! Error type shared by every navigation operation.

use thiserror::Error;

/// Failures surfaced by the navigator, its cache and its collaborators.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// A navigation is already running and interruption is disallowed.
    #[error("A transition is currently in progress")]
    InProgress,
    /// A newer navigation aborted this one before it finished.
    #[error("navigation to {0} was superseded by a newer navigation")]
    Superseded(String),
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("fetching {url} returned non-2xx HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("fetching {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("page {url} has no [data-taxi-view] element")]
    MissingViewRoot { url: String },
    #[error("document has no [data-taxi] wrapper element")]
    MissingWrapper,
    #[error("renderer {0:?} is not registered")]
    UnknownRenderer(String),
    #[error("transition {0:?} is not registered")]
    UnknownTransition(String),
    #[error("registry has no \"default\" entry")]
    MissingDefault,
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidRoutePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid navigator options: {0}")]
    Options(#[from] serde_json::Error),
}
