//! Page cache: one entry per visited or preloaded URL, keyed by fragment-less href.

use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use html::{Document, NodeId};
use log::{debug, warn};

use crate::config::{NOCACHE_ATTR, VIEW_ATTR, VIEW_SELECTOR};
use crate::error::NavigationError;
use crate::registry::{Registry, RendererFactory};
use crate::renderer::{Renderer, RendererContext};
use crate::scripts::ReloadJsFilter;
use crate::window::SharedDocument;

/// A parsed page plus the renderer that shows it.
pub struct CacheEntry {
    /// `[data-taxi-view]` element inside `page`
    pub content: NodeId,
    pub page: Rc<Document>,
    pub title: String,
    /// Reloadable `<script>` elements of `page`, in document order
    pub scripts: Vec<NodeId>,
    /// Set when the view root carries `data-taxi-nocache`
    pub skip_cache: bool,
    /// Name of the renderer the view root asked for
    pub renderer_name: String,
    pub renderer: Box<dyn Renderer>,
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("title", &self.title)
            .field("content", &self.content)
            .field("scripts", &self.scripts)
            .field("skip_cache", &self.skip_cache)
            .field("renderer_name", &self.renderer_name)
            .finish_non_exhaustive()
    }
}

/// Turns parsed pages into cache entries.
pub struct EntryBuilder<'a> {
    pub renderers: &'a Registry<RendererFactory>,
    /// Renderer used when the view root names none
    pub default_renderer: &'a str,
    pub reload_js: &'a ReloadJsFilter,
    pub document: &'a SharedDocument,
    pub wrapper: NodeId,
}

impl EntryBuilder<'_> {
    /// Build the entry for `page`, fetched from `href`.
    ///
    /// # Errors
    /// Returns [`NavigationError::MissingViewRoot`] if the page has no view root, or
    /// [`NavigationError::UnknownRenderer`] if it names a renderer that is not registered.
    pub fn build(&self, href: &str, page: Document) -> Result<CacheEntry, NavigationError> {
        let content = page
            .query_selector(VIEW_SELECTOR)
            .ok_or_else(|| NavigationError::MissingViewRoot {
                url: href.to_owned(),
            })?;
        let renderer_name = match page.attr(content, VIEW_ATTR) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => self.default_renderer.to_owned(),
        };
        let Some(factory) = self.renderers.get(&renderer_name) else {
            warn!("Page {href} asks for unregistered renderer {renderer_name:?}");
            return Err(NavigationError::UnknownRenderer(renderer_name));
        };

        let title = page.title();
        let skip_cache = page.has_attr(content, NOCACHE_ATTR);
        let scripts = self.reload_js.collect(&page);
        let page = Rc::new(page);
        let renderer = factory(RendererContext {
            document: Rc::clone(self.document),
            wrapper: self.wrapper,
            title: title.clone(),
            content,
            page: Rc::clone(&page),
        });
        debug!("Built cache entry for {href} ({renderer_name}, {} scripts)", scripts.len());

        Ok(CacheEntry {
            content,
            page,
            title,
            scripts,
            skip_cache,
            renderer_name,
            renderer,
        })
    }
}

/// Entries keyed by [`crate::Location::href`].
#[derive(Debug, Default)]
pub struct PageCache {
    entries: HashMap<String, Rc<CacheEntry>>,
}

impl PageCache {
    pub fn get(&self, href: &str) -> Option<Rc<CacheEntry>> {
        self.entries.get(href).map(Rc::clone)
    }

    /// Store `entry`, returning the one it replaced.
    pub fn insert(&mut self, href: String, entry: Rc<CacheEntry>) -> Option<Rc<CacheEntry>> {
        self.entries.insert(href, entry)
    }

    pub fn remove(&mut self, href: &str) -> Option<Rc<CacheEntry>> {
        self.entries.remove(href)
    }

    pub fn contains(&self, href: &str) -> bool {
        self.entries.contains_key(href)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;
    use crate::registry::renderer_factory;
    use crate::renderer::DefaultRenderer;

    fn live() -> (SharedDocument, NodeId) {
        let live = Document::parse("<div data-taxi><main data-taxi-view></main></div>");
        let wrapper = live.query_selector("[data-taxi]").unwrap();
        (Rc::new(RefCell::new(live)), wrapper)
    }

    #[test]
    fn entry_picks_renderer_and_reads_markers() {
        let (document, wrapper) = live();
        let renderers = Registry::default().with("article", renderer_factory(DefaultRenderer::new));
        let reload_js = ReloadJsFilter::default();
        let builder = EntryBuilder {
            renderers: &renderers,
            default_renderer: "default",
            reload_js: &reload_js,
            document: &document,
            wrapper,
        };

        let page = Document::parse(
            "<title> Post </title><div data-taxi><article data-taxi-view=article data-taxi-nocache>x</article></div>\
             <script data-taxi-reload>a()</script><script>b()</script>",
        );
        let entry = builder.build("https://site.test/post", page).unwrap();
        assert_eq!(entry.renderer_name, "article");
        assert_eq!(entry.title, "Post");
        assert!(entry.skip_cache);
        assert_eq!(entry.scripts.len(), 1);
        assert_eq!(entry.page.tag_name(entry.content), Some("article"));
    }

    #[test]
    fn entry_rejects_unknown_renderer_and_missing_view() {
        let (document, wrapper) = live();
        let renderers = Registry::default();
        let reload_js = ReloadJsFilter::default();
        let builder = EntryBuilder {
            renderers: &renderers,
            default_renderer: "default",
            reload_js: &reload_js,
            document: &document,
            wrapper,
        };

        let err = builder
            .build("/a", Document::parse("<main data-taxi-view=gallery></main>"))
            .unwrap_err();
        assert!(matches!(err, NavigationError::UnknownRenderer(name) if name == "gallery"));

        let err = builder
            .build("/b", Document::parse("<main></main>"))
            .unwrap_err();
        assert!(matches!(err, NavigationError::MissingViewRoot { .. }));
    }
}
