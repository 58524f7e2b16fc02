//! Renderers own a cache entry's view: staging it off-screen, swapping it into
//! the wrapper and driving the transition around the swap.

use core::cell::Cell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use html::{Document, NodeId};
use log::{trace, warn};

use crate::transition::{CancelSignal, Transition, TransitionArgs, Trigger};
use crate::window::SharedDocument;

/// Everything a renderer factory gets to build a renderer for one cache entry.
#[derive(Clone)]
pub struct RendererContext {
    /// The live document
    pub document: SharedDocument,
    /// `[data-taxi]` element in the live document
    pub wrapper: NodeId,
    /// Title of the cached page
    pub title: String,
    /// `[data-taxi-view]` element inside `page`
    pub content: NodeId,
    /// Parsed snapshot of the cached page
    pub page: Rc<Document>,
}

/// The transition and trigger of the navigation a renderer is taking part in.
#[derive(Clone, Copy)]
pub struct TransitionStep<'a> {
    pub transition: &'a dyn Transition,
    pub trigger: &'a Trigger,
    pub signal: &'a CancelSignal,
}

/// Per-view lifecycle. One renderer lives in each cache entry and is reused
/// every time that entry is shown.
pub trait Renderer {
    /// Run the entry hooks for the page the navigator booted on.
    fn initial_load(&self);

    /// Stage the incoming view off-screen. Safe to call repeatedly.
    fn create_dom(&self);

    /// Animate the current view out, then remove it if `remove_old_content` is set.
    fn leave<'a>(&'a self, step: TransitionStep<'a>, remove_old_content: bool)
    -> LocalBoxFuture<'a, ()>;

    /// Set the document title and attach the staged view to the wrapper.
    fn update(&self);

    /// Animate the attached view in.
    fn enter<'a>(&'a self, step: TransitionStep<'a>) -> LocalBoxFuture<'a, ()>;
}

/// Lifecycle callbacks for [`DefaultRenderer`]. All default to doing nothing.
pub trait RendererHooks {
    fn on_enter(&self, _context: &RendererContext) {}
    fn on_enter_completed(&self, _context: &RendererContext) {}
    fn on_leave(&self, _context: &RendererContext) {}
    fn on_leave_completed(&self, _context: &RendererContext) {}
}

impl RendererHooks for () {}

/// Imports the cached view into the live document and appends it to the wrapper.
pub struct DefaultRenderer<H = ()> {
    context: RendererContext,
    hooks: H,
    staged: Cell<Option<NodeId>>,
    live: Cell<Option<NodeId>>,
}

impl DefaultRenderer {
    pub fn new(context: RendererContext) -> Self {
        Self::with_hooks(context, ())
    }
}

impl<H: RendererHooks> DefaultRenderer<H> {
    pub fn with_hooks(context: RendererContext, hooks: H) -> Self {
        let live = context
            .document
            .borrow()
            .last_element_child(context.wrapper);
        Self {
            context,
            hooks,
            staged: Cell::new(None),
            live: Cell::new(live),
        }
    }

    pub fn context(&self) -> &RendererContext {
        &self.context
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// The view root this renderer last attached, or the wrapper's last element at construction.
    pub fn content(&self) -> Option<NodeId> {
        self.live.get()
    }

    fn args<'a>(&self, step: TransitionStep<'a>) -> TransitionArgs<'a> {
        TransitionArgs {
            node: self.live.get(),
            wrapper: self.context.wrapper,
            trigger: step.trigger,
            signal: step.signal,
        }
    }

    fn remove(&self) {
        let mut document = self.context.document.borrow_mut();
        if let Some(first) = document.first_element_child(self.context.wrapper) {
            document.remove(first);
        }
    }
}

impl<H: RendererHooks> Renderer for DefaultRenderer<H> {
    fn initial_load(&self) {
        self.hooks.on_enter(&self.context);
        self.hooks.on_enter_completed(&self.context);
    }

    fn create_dom(&self) {
        if self.staged.get().is_some() {
            return;
        }
        let staged = self
            .context
            .document
            .borrow_mut()
            .import_node(&self.context.page, self.context.content);
        trace!("Staged view for {:?}", self.context.title);
        self.staged.set(staged);
    }

    fn leave<'a>(
        &'a self,
        step: TransitionStep<'a>,
        remove_old_content: bool,
    ) -> LocalBoxFuture<'a, ()> {
        Box::pin(async move {
            self.hooks.on_leave(&self.context);
            step.transition.leave(self.args(step)).await;
            if remove_old_content {
                self.remove();
            }
            self.hooks.on_leave_completed(&self.context);
        })
    }

    fn update(&self) {
        let mut document = self.context.document.borrow_mut();
        document.set_title(&self.context.title);
        match self.staged.take() {
            Some(staged) => {
                if let Err(err) = document.append_child(self.context.wrapper, staged) {
                    warn!("Could not attach view for {:?}: {err}", self.context.title);
                }
            }
            None => warn!("update() without create_dom() for {:?}", self.context.title),
        }
        self.live
            .set(document.last_element_child(self.context.wrapper));
    }

    fn enter<'a>(&'a self, step: TransitionStep<'a>) -> LocalBoxFuture<'a, ()> {
        Box::pin(async move {
            self.hooks.on_enter(&self.context);
            step.transition.enter(self.args(step)).await;
            self.hooks.on_enter_completed(&self.context);
        })
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;
    use crate::transition::DefaultTransition;

    #[derive(Default)]
    struct Journal(RefCell<Vec<&'static str>>);

    impl RendererHooks for Journal {
        fn on_enter(&self, _context: &RendererContext) {
            self.0.borrow_mut().push("enter");
        }
        fn on_enter_completed(&self, _context: &RendererContext) {
            self.0.borrow_mut().push("enter-completed");
        }
        fn on_leave(&self, _context: &RendererContext) {
            self.0.borrow_mut().push("leave");
        }
        fn on_leave_completed(&self, _context: &RendererContext) {
            self.0.borrow_mut().push("leave-completed");
        }
    }

    fn fixture() -> (SharedDocument, RendererContext) {
        let live = Document::parse(
            "<title>A</title><div data-taxi><main data-taxi-view id=a>old</main></div>",
        );
        let wrapper = live.query_selector("[data-taxi]").unwrap();
        let page = Document::parse(
            "<title>B</title><div data-taxi><main data-taxi-view id=b>new</main></div>",
        );
        let content = page.query_selector("main").unwrap();
        let document = Rc::new(RefCell::new(live));
        let context = RendererContext {
            document: Rc::clone(&document),
            wrapper,
            title: page.title(),
            content,
            page: Rc::new(page),
        };
        (document, context)
    }

    #[tokio::test]
    async fn swaps_view_and_runs_hooks_in_order() {
        let (document, context) = fixture();
        let renderer = DefaultRenderer::with_hooks(context, Journal::default());
        let transition = DefaultTransition;
        let signal = CancelSignal::detached();
        let step = TransitionStep {
            transition: &transition,
            trigger: &Trigger::Programmatic,
            signal: &signal,
        };

        renderer.create_dom();
        renderer.create_dom();
        renderer.leave(step, true).await;
        renderer.update();
        renderer.enter(step).await;

        let doc = document.borrow();
        let wrapper = doc.query_selector("[data-taxi]").unwrap();
        assert_eq!(doc.inner_html(wrapper), "<main data-taxi-view=\"\" id=\"b\">new</main>");
        assert_eq!(doc.title(), "B");
        assert_eq!(renderer.content(), doc.query_selector("#b"));
        assert_eq!(
            *renderer.hooks().0.borrow(),
            ["leave", "leave-completed", "enter", "enter-completed"]
        );
    }

    #[tokio::test]
    async fn keeps_old_content_when_asked() {
        let (document, context) = fixture();
        let renderer = DefaultRenderer::new(context);
        let transition = DefaultTransition;
        let signal = CancelSignal::detached();
        let step = TransitionStep {
            transition: &transition,
            trigger: &Trigger::Popstate,
            signal: &signal,
        };

        renderer.create_dom();
        renderer.leave(step, false).await;
        renderer.update();

        let doc = document.borrow();
        assert_eq!(doc.query_selector_all("[data-taxi-view]").len(), 2);
    }
}
