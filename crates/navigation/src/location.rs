//! Normalized view of a URL as the navigator compares them.

use url::Url;

use crate::error::NavigationError;

/// A URL broken into the parts navigation decisions are made on.
///
/// `href` never carries a fragment, so two locations that differ only by hash
/// share a cache key. `pathname` has trailing slashes removed, which turns the
/// site root into the empty string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The string the location was parsed from, before resolution
    pub raw: String,
    /// Absolute URL without its fragment
    pub href: String,
    /// Host name plus a non-default port
    pub host: String,
    /// Whether the URL carries a non-empty fragment
    pub has_hash: bool,
    /// Path with trailing slashes stripped
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
    url: Url,
}

impl Location {
    /// Resolve `raw` against `base` (the current window location) and normalize it.
    ///
    /// # Errors
    /// Returns [`NavigationError::InvalidUrl`] if `base` is not absolute or `raw` cannot be joined onto it.
    pub fn parse(raw: &str, base: &str) -> Result<Self, NavigationError> {
        let base_url = Url::parse(base).map_err(|source| NavigationError::InvalidUrl {
            url: base.to_owned(),
            source,
        })?;
        let url = base_url
            .join(raw)
            .map_err(|source| NavigationError::InvalidUrl {
                url: raw.to_owned(),
                source,
            })?;

        let mut without_fragment = url.clone();
        without_fragment.set_fragment(None);
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => String::new(),
        };

        Ok(Self {
            raw: raw.to_owned(),
            href: without_fragment.into(),
            host,
            has_hash: url.fragment().is_some_and(|fragment| !fragment.is_empty()),
            pathname: url.path().trim_end_matches('/').to_owned(),
            search: url.query().map(|query| format!("?{query}")).unwrap_or_default(),
            url,
        })
    }

    /// The fully resolved URL, fragment included.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_links_resolve_against_the_base() {
        let location = Location::parse("../b/?q=1#top", "https://site.test:8080/a/x").unwrap();
        assert_eq!(location.href, "https://site.test:8080/b/?q=1");
        assert_eq!(location.pathname, "/b");
        assert_eq!(location.host, "site.test:8080");
        assert_eq!(location.search, "?q=1");
        assert!(location.has_hash);
        assert_eq!(location.raw, "../b/?q=1#top");
    }

    #[test]
    fn root_pathname_is_empty_and_default_port_is_hidden() {
        let location = Location::parse("https://site.test:443/", "https://site.test/").unwrap();
        assert_eq!(location.pathname, "");
        assert_eq!(location.host, "site.test");
        assert!(!location.has_hash);
    }

    #[test]
    fn empty_fragment_is_not_a_hash() {
        let location = Location::parse("/a#", "https://site.test/").unwrap();
        assert!(!location.has_hash);
        assert_eq!(location.href, "https://site.test/a");
    }

    #[test]
    fn relative_base_is_rejected() {
        let err = Location::parse("/a", "not a url").unwrap_err();
        assert!(matches!(err, NavigationError::InvalidUrl { .. }));
    }
}
