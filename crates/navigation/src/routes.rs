//! Route-based transition selection.

use regex::Regex;

use crate::error::NavigationError;
use crate::location::Location;

/// Maps a (from, to) pair of locations to a transition name.
pub trait RouteStore {
    /// Register `transition` for navigations from a path matching `from_pattern`
    /// to a path matching `to_pattern`.
    ///
    /// # Errors
    /// Returns an error if a pattern is rejected by the store.
    fn add(
        &mut self,
        from_pattern: &str,
        to_pattern: &str,
        transition: &str,
    ) -> Result<(), NavigationError>;

    fn find_match(&self, from: &Location, to: &Location) -> Option<String>;
}

struct ToRoute {
    pattern: String,
    regex: Regex,
    transition: String,
}

struct FromRoute {
    pattern: String,
    regex: Regex,
    targets: Vec<ToRoute>,
}

/// Regex routes matched against [`Location::pathname`], anchored at both ends.
///
/// Only the first registered from-pattern that matches is consulted; its
/// to-patterns are tried in registration order.
#[derive(Default)]
pub struct PatternRouteStore {
    routes: Vec<FromRoute>,
}

fn anchored(pattern: &str) -> Result<Regex, NavigationError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
        NavigationError::InvalidRoutePattern {
            pattern: pattern.to_owned(),
            source,
        }
    })
}

impl PatternRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.iter().map(|route| route.targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RouteStore for PatternRouteStore {
    fn add(
        &mut self,
        from_pattern: &str,
        to_pattern: &str,
        transition: &str,
    ) -> Result<(), NavigationError> {
        let to_regex = anchored(to_pattern)?;
        let index = match self
            .routes
            .iter()
            .position(|route| route.pattern == from_pattern)
        {
            Some(index) => index,
            None => {
                self.routes.push(FromRoute {
                    pattern: from_pattern.to_owned(),
                    regex: anchored(from_pattern)?,
                    targets: Vec::new(),
                });
                self.routes.len().saturating_sub(1)
            }
        };
        let Some(route) = self.routes.get_mut(index) else {
            return Ok(());
        };
        match route
            .targets
            .iter_mut()
            .find(|target| target.pattern == to_pattern)
        {
            Some(existing) => transition.clone_into(&mut existing.transition),
            None => route.targets.push(ToRoute {
                pattern: to_pattern.to_owned(),
                regex: to_regex,
                transition: transition.to_owned(),
            }),
        }
        Ok(())
    }

    fn find_match(&self, from: &Location, to: &Location) -> Option<String> {
        let route = self
            .routes
            .iter()
            .find(|route| route.regex.is_match(&from.pathname))?;
        route
            .targets
            .iter()
            .find(|target| target.regex.is_match(&to.pathname))
            .map(|target| target.transition.clone())
    }
}
