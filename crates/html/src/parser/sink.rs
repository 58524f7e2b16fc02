//! html5ever `TreeSink` that builds directly into the document arena.

use core::cell::RefCell;
use std::borrow::Cow;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, ExpandedName, QualName, local_name, namespace_url, ns};
use indextree::{Arena, Node, NodeId};
use log::trace;

use crate::dom::{DOMNode, Document, NodeKind};

/// Parser-side handle. The qualified name travels with the handle so that
/// `elem_name` can borrow it without touching the arena.
#[derive(Clone)]
pub struct SinkHandle {
    id: NodeId,
    name: Rc<QualName>,
}

pub struct ArenaSink {
    dom: RefCell<Arena<DOMNode>>,
    document: SinkHandle,
}

impl Default for ArenaSink {
    fn default() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        Self {
            dom: RefCell::new(dom),
            document: SinkHandle {
                id: root,
                name: unnamed(),
            },
        }
    }
}

fn unnamed() -> Rc<QualName> {
    Rc::new(QualName::new(None, ns!(), local_name!("")))
}

impl ArenaSink {
    fn new_handle(&self, node: DOMNode, name: Rc<QualName>) -> SinkHandle {
        let id = self.dom.borrow_mut().new_node(node);
        SinkHandle { id, name }
    }

    fn comment(&self, text: &str) -> SinkHandle {
        let node = DOMNode {
            kind: NodeKind::Comment {
                text: text.to_owned(),
            },
            ..DOMNode::default()
        };
        self.new_handle(node, unnamed())
    }

    /// Append text to `parent`, merging with a trailing text node.
    fn append_text(&self, parent: NodeId, text: &str) {
        let mut dom = self.dom.borrow_mut();
        let last = dom.get(parent).and_then(Node::last_child);
        if let Some(last) = last
            && let Some(NodeKind::Text { text: existing }) =
                dom.get_mut(last).map(|node| &mut node.get_mut().kind)
        {
            existing.push_str(text);
            return;
        }
        let node = dom.new_node(DOMNode::text(text));
        parent.append(node, &mut *dom);
    }

    /// Insert text before `sibling`, merging with a preceding text node.
    fn insert_text_before(&self, sibling: NodeId, text: &str) {
        let mut dom = self.dom.borrow_mut();
        let previous = dom.get(sibling).and_then(Node::previous_sibling);
        if let Some(previous) = previous
            && let Some(NodeKind::Text { text: existing }) =
                dom.get_mut(previous).map(|node| &mut node.get_mut().kind)
        {
            existing.push_str(text);
            return;
        }
        let node = dom.new_node(DOMNode::text(text));
        sibling.insert_before(node, &mut *dom);
    }
}

impl TreeSink for ArenaSink {
    type Handle = SinkHandle;
    type Output = Document;
    type ElemName<'a> = ExpandedName<'a>;

    fn finish(self) -> Self::Output {
        Document {
            dom: self.dom.into_inner(),
            root: self.document.id,
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!("HTML parse error: {msg}");
    }

    fn get_document(&self) -> Self::Handle {
        self.document.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a> {
        target.name.expanded()
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let node = DOMNode {
            kind: NodeKind::Element {
                tag: name.local.to_string(),
            },
            attrs: attrs
                .into_iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect(),
        };
        self.new_handle(node, Rc::new(name))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.comment(&text)
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        // Processing instructions only occur in foreign content; keep them as comments
        self.comment(&data)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(node) => {
                let mut dom = self.dom.borrow_mut();
                node.id.detach(&mut *dom);
                parent.id.append(node.id, &mut *dom);
            }
            NodeOrText::AppendText(text) => self.append_text(parent.id, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self
            .dom
            .borrow()
            .get(element.id)
            .and_then(Node::parent)
            .is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let node = DOMNode {
            kind: NodeKind::Doctype {
                name: name.to_string(),
            },
            ..DOMNode::default()
        };
        let mut dom = self.dom.borrow_mut();
        let doctype = dom.new_node(node);
        self.document.id.append(doctype, &mut *dom);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        match new_node {
            NodeOrText::AppendNode(node) => {
                let mut dom = self.dom.borrow_mut();
                node.id.detach(&mut *dom);
                sibling.id.insert_before(node.id, &mut *dom);
            }
            NodeOrText::AppendText(text) => self.insert_text_before(sibling.id, &text),
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut dom = self.dom.borrow_mut();
        let Some(node) = dom.get_mut(target.id).map(Node::get_mut) else {
            return;
        };
        for attr in attrs {
            let name = attr.name.local.to_string();
            if node.attr(&name).is_none() {
                node.attrs.push((name, attr.value.to_string()));
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.id.detach(&mut *self.dom.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut dom = self.dom.borrow_mut();
        let children: Vec<NodeId> = node.id.children(&*dom).collect();
        for child in children {
            child.detach(&mut *dom);
            new_parent.id.append(child, &mut *dom);
        }
    }
}
