//! Named factories for renderers and transitions.

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::DEFAULT_NAME;
use crate::error::NavigationError;
use crate::renderer::{DefaultRenderer, Renderer, RendererContext};
use crate::transition::{DefaultTransition, Transition, TransitionContext};

/// Builds the renderer for a freshly created cache entry.
pub type RendererFactory = Rc<dyn Fn(RendererContext) -> Box<dyn Renderer>>;
/// Builds the transition for one navigation.
pub type TransitionFactory = Rc<dyn Fn(TransitionContext) -> Box<dyn Transition>>;

/// Wrap a renderer constructor as a [`RendererFactory`].
pub fn renderer_factory<R, F>(build: F) -> RendererFactory
where
    R: Renderer + 'static,
    F: Fn(RendererContext) -> R + 'static,
{
    Rc::new(move |context: RendererContext| -> Box<dyn Renderer> { Box::new(build(context)) })
}

/// Wrap a transition constructor as a [`TransitionFactory`].
pub fn transition_factory<T, F>(build: F) -> TransitionFactory
where
    T: Transition + 'static,
    F: Fn(TransitionContext) -> T + 'static,
{
    Rc::new(move |context: TransitionContext| -> Box<dyn Transition> { Box::new(build(context)) })
}

/// Name to factory map that always contains a `"default"` entry.
#[derive(Clone)]
pub struct Registry<F> {
    entries: HashMap<String, F>,
}

impl<F> Registry<F> {
    /// Start a registry whose `"default"` entry is `default`.
    pub fn new(default: F) -> Self {
        let mut entries = HashMap::new();
        entries.insert(DEFAULT_NAME.to_owned(), default);
        Self { entries }
    }

    /// Adopt an existing map.
    ///
    /// # Errors
    /// Returns [`NavigationError::MissingDefault`] if the map has no `"default"` key.
    pub fn from_map(entries: HashMap<String, F>) -> Result<Self, NavigationError> {
        if entries.contains_key(DEFAULT_NAME) {
            Ok(Self { entries })
        } else {
            Err(NavigationError::MissingDefault)
        }
    }

    /// Builder-style [`Registry::insert`].
    #[must_use]
    pub fn with(mut self, name: &str, factory: F) -> Self {
        self.insert(name, factory);
        self
    }

    /// Register or replace `name`.
    pub fn insert(&mut self, name: &str, factory: F) {
        self.entries.insert(name.to_owned(), factory);
    }

    pub fn get(&self, name: &str) -> Option<&F> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl Default for Registry<RendererFactory> {
    fn default() -> Self {
        Self::new(renderer_factory(DefaultRenderer::new))
    }
}

impl Default for Registry<TransitionFactory> {
    fn default() -> Self {
        Self::new(transition_factory(|_context| DefaultTransition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_map_requires_default() {
        let mut map: HashMap<String, TransitionFactory> = HashMap::new();
        map.insert("fade".to_owned(), transition_factory(|_context| DefaultTransition));
        assert!(matches!(
            Registry::from_map(map.clone()),
            Err(NavigationError::MissingDefault)
        ));

        map.insert(DEFAULT_NAME.to_owned(), transition_factory(|_context| DefaultTransition));
        let registry = Registry::from_map(map).unwrap();
        assert!(registry.contains("fade"));
        assert!(registry.get("slide").is_none());
    }
}
