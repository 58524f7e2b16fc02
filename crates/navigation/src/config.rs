//! Navigator options and the markup conventions the navigator relies on.
//!
//! Options can be built programmatically, deserialized from a camelCase JSON
//! object, or read from environment variables.

use std::env;

use serde::Deserialize;

use crate::error::NavigationError;

/// Marks the element whose children are swapped between pages.
pub const WRAPPER_SELECTOR: &str = "[data-taxi]";
/// Marks the view root inside the wrapper; its value names the renderer.
pub const VIEW_ATTR: &str = "data-taxi-view";
/// Selector form of [`VIEW_ATTR`].
pub const VIEW_SELECTOR: &str = "[data-taxi-view]";
/// A view root carrying this attribute is always refetched.
pub const NOCACHE_ATTR: &str = "data-taxi-nocache";
/// Scripts carrying this attribute are reconciled after each navigation.
pub const RELOAD_ATTR: &str = "data-taxi-reload";
/// Per-link transition override.
pub const TRANSITION_ATTR: &str = "data-transition";
/// Name every registry must provide.
pub const DEFAULT_NAME: &str = "default";
/// Anchors intercepted when no `links` option is given.
pub const DEFAULT_LINKS: &str = r"a:not([target]):not([href^=\#]):not([data-taxi-ignore])";

/// Runtime options for a [`crate::Navigator`].
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigatorOptions {
    /// Selector for anchors whose clicks are intercepted
    pub links: String,
    /// Remove the outgoing view root once its leave transition finishes
    pub remove_old_content: bool,
    /// Let a new navigation supersede one that is still running
    pub allow_interruption: bool,
    /// Never serve navigations from the cache
    pub bypass_cache: bool,
    /// Reconcile `data-taxi-reload` scripts after each navigation
    pub reload_js: bool,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            links: DEFAULT_LINKS.to_owned(),
            remove_old_content: true,
            allow_interruption: false,
            bypass_cache: false,
            reload_js: true,
        }
    }
}

impl NavigatorOptions {
    /// Parse options from a JSON object such as `{"allowInterruption": true}`.
    /// Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`NavigationError::Options`] if the JSON is malformed or a key has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, NavigationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from environment variables, defaulting anything unset.
    ///
    /// Reads the following environment variables:
    /// - `NAVIGATOR_LINKS`: link selector
    /// - `NAVIGATOR_ALLOW_INTERRUPTION`: "1" to allow interruption
    /// - `NAVIGATOR_BYPASS_CACHE`: "1" to bypass the cache
    /// - `NAVIGATOR_REMOVE_OLD_CONTENT`: "0" to keep outgoing content
    /// - `NAVIGATOR_RELOAD_JS`: "0" to disable script reconciliation
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| match env::var(name).ok().as_deref() {
            Some("1" | "true") => true,
            Some("0" | "false") => false,
            _ => default,
        };
        Self {
            links: env::var("NAVIGATOR_LINKS")
                .ok()
                .filter(|links| !links.trim().is_empty())
                .unwrap_or(defaults.links),
            remove_old_content: flag("NAVIGATOR_REMOVE_OLD_CONTENT", defaults.remove_old_content),
            allow_interruption: flag("NAVIGATOR_ALLOW_INTERRUPTION", defaults.allow_interruption),
            bypass_cache: flag("NAVIGATOR_BYPASS_CACHE", defaults.bypass_cache),
            reload_js: flag("NAVIGATOR_RELOAD_JS", defaults.reload_js),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys_are_camel_case_and_optional() {
        let options =
            NavigatorOptions::from_json(r#"{"allowInterruption": true, "removeOldContent": false}"#)
                .unwrap();
        assert!(options.allow_interruption);
        assert!(!options.remove_old_content);
        assert!(!options.bypass_cache);
        assert!(options.reload_js);
        assert_eq!(options.links, DEFAULT_LINKS);
    }

    #[test]
    fn malformed_json_is_an_options_error() {
        let err = NavigatorOptions::from_json(r#"{"bypassCache": "yes"}"#).unwrap_err();
        assert!(matches!(err, NavigationError::Options(_)));
    }
}
