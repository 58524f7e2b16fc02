#![allow(dead_code, reason = "Each test binary uses a different subset of the fixtures")]

use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Error, anyhow};
use futures::future::LocalBoxFuture;
use html::Document;
use navigation::{
    EventPayload, FetchResponse, HeadlessWindow, JsEngine, NavigationEvent, Navigator,
    NavigatorBuilder, PageFetcher, Registry, SharedDocument, SharedEngine, SharedWindow,
    Transition, TransitionArgs, TransitionFactory, transition_factory,
};
use tokio::sync::oneshot;
use url::Url;

pub const ORIGIN: &str = "https://site.test";

pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn init_logging() {
    drop(env_logger::builder().is_test(true).try_init());
}

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// A full page whose view root is named `view` (empty for the default renderer).
pub fn page(title: &str, view: &str, content: &str) -> String {
    page_with(title, &format!("data-taxi-view=\"{view}\""), content, "")
}

pub fn page_with(title: &str, view_attrs: &str, content: &str, trailer: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body>\
         <nav><a id=\"home\" href=\"/a\">home</a></nav>\
         <div data-taxi><main {view_attrs}>{content}</main></div>{trailer}</body></html>"
    )
}

/// Serves canned pages and records every request.
#[derive(Default)]
pub struct FakeFetcher {
    pages: RefCell<HashMap<String, (u16, String)>>,
    requests: RefCell<Vec<String>>,
    headers: RefCell<Vec<(String, String)>>,
    pub journal: Journal,
}

impl FakeFetcher {
    pub fn serve(&self, path: &str, body: String) {
        self.serve_status(path, 200, body);
    }

    pub fn serve_status(&self, path: &str, status: u16, body: String) {
        self.pages.borrow_mut().insert(url(path), (status, body));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        let target = url(path);
        self.requests
            .borrow()
            .iter()
            .filter(|request| **request == target)
            .count()
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers.borrow().clone()
    }
}

impl PageFetcher for FakeFetcher {
    fn get<'a>(
        &'a self,
        url: &'a Url,
        headers: &'a [(&'static str, &'static str)],
    ) -> LocalBoxFuture<'a, Result<FetchResponse, Error>> {
        Box::pin(async move {
            let mut key = url.clone();
            key.set_fragment(None);
            let key = String::from(key);
            self.journal.borrow_mut().push(format!("fetch {key}"));
            self.requests.borrow_mut().push(key.clone());
            self.headers.borrow_mut().extend(
                headers
                    .iter()
                    .map(|(name, value)| ((*name).to_owned(), (*value).to_owned())),
            );
            tokio::task::yield_now().await;
            let served = self.pages.borrow().get(&key).cloned();
            match served {
                Some((status, body)) => Ok(FetchResponse { status, body }),
                None => Err(anyhow!("connection refused")),
            }
        })
    }
}

/// Records every script it is asked to run.
#[derive(Default)]
pub struct RecordingEngine {
    pub executed: Vec<(String, String)>,
}

impl RecordingEngine {
    pub fn sources(&self) -> Vec<String> {
        self.executed.iter().map(|(_, source)| source.clone()).collect()
    }
}

impl JsEngine for RecordingEngine {
    fn eval_script(&mut self, source: &str, url: &str) -> Result<(), Error> {
        self.executed.push((url.to_owned(), source.to_owned()));
        Ok(())
    }
}

/// Holds leave phases open until released. Each `close` gates one leave.
#[derive(Clone, Default)]
pub struct Gate(Rc<RefCell<Option<oneshot::Receiver<()>>>>);

impl Gate {
    pub fn close(&self) -> oneshot::Sender<()> {
        let (release, wait) = oneshot::channel();
        *self.0.borrow_mut() = Some(wait);
        release
    }
}

/// Logs its phases to a journal and optionally waits on a gate while leaving.
pub struct RecordingTransition {
    pub name: &'static str,
    pub journal: Journal,
    pub gate: Gate,
}

impl Transition for RecordingTransition {
    fn leave<'a>(&'a self, _args: TransitionArgs<'a>) -> LocalBoxFuture<'a, ()> {
        Box::pin(async move {
            self.journal.borrow_mut().push(format!("{}:leave", self.name));
            let wait = self.gate.0.borrow_mut().take();
            if let Some(wait) = wait {
                drop(wait.await);
            }
        })
    }

    fn enter<'a>(&'a self, _args: TransitionArgs<'a>) -> LocalBoxFuture<'a, ()> {
        Box::pin(async move {
            self.journal.borrow_mut().push(format!("{}:enter", self.name));
        })
    }
}

/// Factory for a [`RecordingTransition`] called `name`.
pub fn recording(name: &'static str, journal: &Journal, gate: &Gate) -> TransitionFactory {
    let journal = Rc::clone(journal);
    let gate = gate.clone();
    transition_factory(move |_context| RecordingTransition {
        name,
        journal: Rc::clone(&journal),
        gate: gate.clone(),
    })
}

pub struct Harness {
    pub navigator: Rc<Navigator>,
    pub document: SharedDocument,
    pub window: Rc<RefCell<HeadlessWindow>>,
    pub fetcher: Rc<FakeFetcher>,
    pub engine: Rc<RefCell<RecordingEngine>>,
    pub journal: Journal,
    pub gate: Gate,
}

/// Boot a navigator on `path` showing `html`, with recording fakes for every
/// collaborator and a `default` transition that journals and can be gated.
pub fn harness_with(
    path: &str,
    html: &str,
    configure: impl FnOnce(NavigatorBuilder, &Journal, &Gate) -> NavigatorBuilder,
) -> Harness {
    init_logging();
    let document: SharedDocument = Rc::new(RefCell::new(Document::parse(html)));
    let window = HeadlessWindow::shared(&url(path));
    let fetcher = Rc::new(FakeFetcher::default());
    let engine = Rc::new(RefCell::new(RecordingEngine::default()));
    let journal = Rc::clone(&fetcher.journal);
    let gate = Gate::default();

    let transitions = Registry::new(recording("default", &journal, &gate));
    let builder = Navigator::builder(Rc::clone(&document), Rc::clone(&window) as SharedWindow)
        .fetcher(Rc::clone(&fetcher) as Rc<dyn PageFetcher>)
        .engine(Rc::clone(&engine) as SharedEngine)
        .transitions(transitions);
    let navigator = configure(builder, &journal, &gate).build().unwrap();

    Harness {
        navigator,
        document,
        window,
        fetcher,
        engine,
        journal,
        gate,
    }
}

pub fn harness(path: &str, html: &str) -> Harness {
    harness_with(path, html, |builder, _, _| builder)
}

impl Harness {
    /// Journal every navigation event, tagged with its name.
    pub fn record_events(&self) {
        for event in [
            NavigationEvent::NavigateOut,
            NavigationEvent::NavigateIn,
            NavigationEvent::NavigateEnd,
        ] {
            let journal = Rc::clone(&self.journal);
            self.navigator.on(event, move |_payload: &EventPayload| {
                journal.borrow_mut().push(event.as_str().to_owned());
            });
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    /// Markup currently inside the wrapper.
    pub fn view(&self) -> String {
        let document = self.document.borrow();
        document.inner_html(self.navigator.wrapper())
    }

    pub fn title(&self) -> String {
        self.document.borrow().title()
    }

    pub fn location(&self) -> String {
        use navigation::BrowserWindow as _;
        self.window.borrow().location_href()
    }

    /// Yield to spawned navigations until the navigator leaves `Idle`.
    pub async fn wait_until_busy(&self) {
        for _ in 0..64 {
            if self.navigator.is_transitioning() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(self.navigator.is_transitioning(), "navigation never started");
    }
}
