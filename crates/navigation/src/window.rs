//! The browser surface the navigator drives: the address bar and session history.

use core::cell::RefCell;
use std::rc::Rc;

use html::Document;
use log::{debug, info};
use url::Url;

/// The live document, shared between the navigator, renderers and transitions.
///
/// Borrows are short and never held across an `.await`.
pub type SharedDocument = Rc<RefCell<Document>>;

/// Window handle shared between the navigator and the link interceptor.
pub type SharedWindow = Rc<RefCell<dyn BrowserWindow>>;

/// Access to `window.location` and `history`.
pub trait BrowserWindow {
    /// Absolute URL currently shown in the address bar.
    fn location_href(&self) -> String;

    /// Push a new history entry, like `history.pushState`.
    fn push_state(&mut self, url: &str);

    /// Rewrite the current history entry, like `history.replaceState`.
    fn replace_state(&mut self, url: &str);

    /// Leave the engine entirely with a full page load, like `window.location = url`.
    fn hard_navigate(&mut self, url: &str);
}

/// In-memory session history for hosts without a real browser, and for tests.
///
/// `back` and `forward` only move the cursor; the host dispatches the
/// resulting popstate to [`crate::LinkInterceptor::on_popstate`] itself.
#[derive(Clone, Debug)]
pub struct HeadlessWindow {
    entries: Vec<String>,
    cursor: usize,
    pushes: Vec<String>,
    hard_navigations: Vec<String>,
}

impl HeadlessWindow {
    pub fn new(url: &str) -> Self {
        Self {
            entries: vec![url.to_owned()],
            cursor: 0,
            pushes: Vec::new(),
            hard_navigations: Vec::new(),
        }
    }

    /// Wrap in the shared handle the navigator expects while keeping a typed handle.
    pub fn shared(url: &str) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(url)))
    }

    fn resolve(&self, url: &str) -> String {
        Url::parse(&self.location_href())
            .and_then(|base| base.join(url))
            .map_or_else(|_| url.to_owned(), String::from)
    }

    /// Step back one entry. Returns `false` at the start of history.
    pub fn back(&mut self) -> bool {
        let Some(previous) = self.cursor.checked_sub(1) else {
            return false;
        };
        self.cursor = previous;
        debug!("history.back -> {}", self.location_href());
        true
    }

    /// Step forward one entry. Returns `false` at the end of history.
    pub fn forward(&mut self) -> bool {
        let next = self.cursor.saturating_add(1);
        if next >= self.entries.len() {
            return false;
        }
        self.cursor = next;
        debug!("history.forward -> {}", self.location_href());
        true
    }

    /// Every session history entry, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// URLs passed to `push_state`, in order.
    pub fn pushes(&self) -> &[String] {
        &self.pushes
    }

    /// URLs the engine gave up on and loaded natively.
    pub fn hard_navigations(&self) -> &[String] {
        &self.hard_navigations
    }
}

impl BrowserWindow for HeadlessWindow {
    fn location_href(&self) -> String {
        self.entries.get(self.cursor).cloned().unwrap_or_default()
    }

    fn push_state(&mut self, url: &str) {
        let resolved = self.resolve(url);
        self.entries.truncate(self.cursor.saturating_add(1));
        self.entries.push(resolved.clone());
        self.cursor = self.entries.len().saturating_sub(1);
        self.pushes.push(resolved);
    }

    fn replace_state(&mut self, url: &str) {
        let resolved = self.resolve(url);
        if let Some(entry) = self.entries.get_mut(self.cursor) {
            *entry = resolved;
        }
    }

    fn hard_navigate(&mut self, url: &str) {
        info!("Full page load of {url}");
        let resolved = self.resolve(url);
        self.hard_navigations.push(resolved.clone());
        self.entries.truncate(self.cursor.saturating_add(1));
        self.entries.push(resolved);
        self.cursor = self.entries.len().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_state_truncates_forward_history() {
        let mut window = HeadlessWindow::new("https://site.test/a");
        window.push_state("/b");
        window.push_state("c");
        assert_eq!(window.location_href(), "https://site.test/c");

        assert!(window.back());
        assert!(window.back());
        assert!(!window.back());
        assert_eq!(window.location_href(), "https://site.test/a");

        window.push_state("/d");
        assert!(!window.forward());
        assert_eq!(
            window.entries(),
            ["https://site.test/a", "https://site.test/d"]
        );
        assert_eq!(window.pushes().len(), 3);
    }

    #[test]
    fn replace_state_keeps_history_length() {
        let mut window = HeadlessWindow::new("https://site.test/a");
        window.replace_state("/z");
        assert_eq!(window.entries(), ["https://site.test/z"]);
        assert!(window.pushes().is_empty());
    }
}
