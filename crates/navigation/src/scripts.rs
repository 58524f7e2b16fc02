//! Script reconciliation after a page swap.
//!
//! Live reloadable scripts whose markup also appears on the incoming page are
//! re-executed in place; incoming scripts with no live twin are appended to
//! `<body>` and executed. Every other live script is left alone.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use anyhow::Error;
use html::{Document, NodeId};
use log::{debug, info, trace, warn};

use crate::config::RELOAD_ATTR;
use crate::window::SharedDocument;

/// Executes script source on behalf of the navigator.
pub trait JsEngine {
    /// Evaluate a classic script. `url` is the script's `src`, or `inline:script-N` for inline scripts.
    ///
    /// # Errors
    /// Returns an error if the script throws or cannot be compiled.
    fn eval_script(&mut self, source: &str, url: &str) -> Result<(), Error>;
}

pub type SharedEngine = Rc<RefCell<dyn JsEngine>>;

/// Engine for hosts without JavaScript: logs and discards every script.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEngine;

impl JsEngine for NullEngine {
    fn eval_script(&mut self, source: &str, url: &str) -> Result<(), Error> {
        trace!("Skipping script {url} ({} bytes)", source.len());
        Ok(())
    }
}

/// Decides whether a `<script>` element takes part in reconciliation.
pub type ScriptPredicate = Rc<dyn Fn(&Document, NodeId) -> bool>;

/// Which scripts are reconciled after each navigation.
#[derive(Clone)]
pub enum ReloadJsFilter {
    Disabled,
    /// Scripts carrying the named attribute
    Marker(String),
    Custom(ScriptPredicate),
}

impl Default for ReloadJsFilter {
    fn default() -> Self {
        Self::Marker(RELOAD_ATTR.to_owned())
    }
}

impl fmt::Debug for ReloadJsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Marker(attr) => f.debug_tuple("Marker").field(attr).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ReloadJsFilter {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn accepts(&self, document: &Document, script: NodeId) -> bool {
        match self {
            Self::Disabled => false,
            Self::Marker(attr) => document.has_attr(script, attr),
            Self::Custom(predicate) => predicate(document, script),
        }
    }

    /// Accepted `<script>` elements of `document` in document order.
    pub fn collect(&self, document: &Document) -> Vec<NodeId> {
        if !self.is_enabled() {
            return Vec::new();
        }
        document
            .query_selector_all("script")
            .into_iter()
            .filter(|script| self.accepts(document, *script))
            .collect()
    }
}

/// How many scripts a reconciliation pass executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Live scripts re-executed in place
    pub reloaded: usize,
    /// Incoming scripts appended to the live document
    pub appended: usize,
}

/// Reconcile the live document's scripts against `incoming`, which are script
/// elements of `page`.
///
/// Markup is compared by exact `outerHTML`. Each incoming script pairs with at
/// most one live script, so a script present on both pages runs exactly once.
pub fn reconcile_scripts(
    document: &SharedDocument,
    engine: &SharedEngine,
    filter: &ReloadJsFilter,
    page: &Document,
    incoming: &[NodeId],
) -> ScriptReport {
    let mut report = ScriptReport::default();
    let mut pending: Vec<(NodeId, String)> = incoming
        .iter()
        .map(|script| (*script, page.outer_html(*script)))
        .collect();
    let live: Vec<(NodeId, String)> = {
        let doc = document.borrow();
        filter
            .collect(&doc)
            .into_iter()
            .map(|script| (script, doc.outer_html(script)))
            .collect()
    };

    for (script, markup) in live {
        let Some(position) = pending.iter().position(|(_, other)| *other == markup) else {
            continue;
        };
        pending.remove(position);
        let fresh = {
            let mut doc = document.borrow_mut();
            doc.duplicate_node(script)
                .filter(|fresh| doc.replace_node(script, *fresh).is_ok())
        };
        match fresh {
            Some(fresh) => {
                execute(document, engine, fresh);
                report.reloaded = report.reloaded.saturating_add(1);
            }
            None => warn!("Could not reload script {markup}"),
        }
    }

    for (script, markup) in pending {
        let imported = {
            let mut doc = document.borrow_mut();
            let parent = doc.body().or_else(|| doc.first_element_child(doc.root()));
            doc.import_node(page, script).filter(|imported| {
                parent.is_some_and(|parent| doc.append_child(parent, *imported).is_ok())
            })
        };
        match imported {
            Some(imported) => {
                execute(document, engine, imported);
                report.appended = report.appended.saturating_add(1);
            }
            None => warn!("Could not append script {markup}"),
        }
    }

    if report != ScriptReport::default() {
        info!(
            "Reconciled scripts: {} reloaded, {} appended",
            report.reloaded, report.appended
        );
    }
    report
}

fn execute(document: &SharedDocument, engine: &SharedEngine, script: NodeId) {
    let (source, url) = {
        let doc = document.borrow();
        let url = doc.attr(script, "src").map_or_else(
            || format!("inline:script-{}", usize::from(script)),
            ToOwned::to_owned,
        );
        (doc.text_content(script), url)
    };
    debug!("Executing script {url}");
    if let Err(err) = engine.borrow_mut().eval_script(&source, &url) {
        warn!("Script {url} failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl JsEngine for Recorder {
        fn eval_script(&mut self, source: &str, _url: &str) -> Result<(), Error> {
            self.0.push(source.to_owned());
            Ok(())
        }
    }

    fn run(live: &str, incoming: &str) -> (SharedDocument, Rc<RefCell<Recorder>>, ScriptReport) {
        let document: SharedDocument = Rc::new(RefCell::new(Document::parse(live)));
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let engine = Rc::clone(&recorder) as SharedEngine;
        let filter = ReloadJsFilter::default();
        let page = Document::parse(incoming);
        let scripts = filter.collect(&page);
        let report = reconcile_scripts(&document, &engine, &filter, &page, &scripts);
        (document, recorder, report)
    }

    #[test]
    fn shared_scripts_reload_and_new_ones_append() {
        let (document, recorder, report) = run(
            "<body><script data-taxi-reload>s1()</script><script data-taxi-reload>s2()</script></body>",
            "<body><script data-taxi-reload>s2()</script><script data-taxi-reload>s3()</script></body>",
        );
        assert_eq!(report, ScriptReport { reloaded: 1, appended: 1 });
        assert_eq!(recorder.borrow().0, ["s2()", "s3()"]);

        let doc = document.borrow();
        let sources: Vec<String> = doc
            .query_selector_all("script")
            .into_iter()
            .map(|script| doc.text_content(script))
            .collect();
        assert_eq!(sources, ["s1()", "s2()", "s3()"]);
    }

    #[test]
    fn duplicate_markup_pairs_one_to_one() {
        let (_, recorder, report) = run(
            "<body><script data-taxi-reload>tick()</script></body>",
            "<body><script data-taxi-reload>tick()</script><script data-taxi-reload>tick()</script></body>",
        );
        assert_eq!(report, ScriptReport { reloaded: 1, appended: 1 });
        assert_eq!(recorder.borrow().0.len(), 2);
    }

    #[test]
    fn unmarked_scripts_are_ignored() {
        let (_, recorder, report) = run(
            "<body><script>analytics()</script></body>",
            "<body><script>analytics()</script></body>",
        );
        assert_eq!(report, ScriptReport::default());
        assert!(recorder.borrow().0.is_empty());
    }

    #[test]
    fn custom_filter_and_disabled_filter() {
        let page = Document::parse("<script type=module>m()</script><script>c()</script>");
        let modules = ReloadJsFilter::Custom(Rc::new(|doc: &Document, script: NodeId| {
            doc.attr(script, "type") == Some("module")
        }));
        assert_eq!(modules.collect(&page).len(), 1);
        assert!(ReloadJsFilter::Disabled.collect(&page).is_empty());
    }
}
