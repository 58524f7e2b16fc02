use indextree::{Arena, Node, NodeId};
use smallvec::SmallVec;

use crate::selectors::{SelectorList, matches_selector_list, parse_selector_list};

mod printing;
pub mod updating;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Doctype { name: String },
    Element { tag: String },
    Text { text: String },
    Comment { text: String },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    pub fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            attrs: SmallVec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            kind: NodeKind::Text {
                text: text.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    /// Tag name for element nodes, lowercase.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }
}

/// A whole document (or a detached copy of one) stored in an arena.
///
/// Cloning a document is a deep copy that keeps every `NodeId` valid in the
/// clone, which is how snapshots of the live page are taken.
#[derive(Clone)]
pub struct Document {
    pub(crate) dom: Arena<DOMNode>,
    pub(crate) root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the document node.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        Self { dom, root }
    }

    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        crate::parser::parse_html(html)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node data, or `None` if the id is unknown or was removed.
    pub fn node(&self, id: NodeId) -> Option<&DOMNode> {
        self.dom
            .get(id)
            .filter(|node| !node.is_removed())
            .map(Node::get)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(DOMNode::tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|node| node.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.dom.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.dom)
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .find(|child| self.node(*child).is_some_and(DOMNode::is_element))
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        id.children(&self.dom).rev()
            .find(|child| self.node(*child).is_some_and(DOMNode::is_element))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        id.preceding_siblings(&self.dom)
            .skip(1)
            .find(|sibling| self.node(*sibling).is_some_and(DOMNode::is_element))
    }

    /// Element descendants of `id` (excluding `id` itself) in document order.
    pub fn element_descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.dom)
            .skip(1)
            .filter(|node| self.node(*node).is_some_and(DOMNode::is_element))
    }

    /// Whether `id` is attached below the document node.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some() && id.ancestors(&self.dom).any(|node| node == self.root)
    }

    /// First element in document order with the given tag.
    pub fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.element_descendants(self.root)
            .find(|node| self.tag_name(*node) == Some(tag))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_by_tag("body")
    }

    /// First element matching `selector`, like `document.querySelector`.
    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let list = parse_selector_list(selector);
        self.element_descendants(self.root)
            .find(|node| matches_selector_list(self, *node, &list))
    }

    /// Every element matching `selector` in document order.
    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let list = parse_selector_list(selector);
        self.element_descendants(self.root)
            .filter(|node| matches_selector_list(self, *node, &list))
            .collect()
    }

    pub fn matches(&self, id: NodeId, list: &SelectorList) -> bool {
        self.node(id).is_some_and(DOMNode::is_element) && matches_selector_list(self, id, list)
    }

    /// Nearest inclusive ancestor of `id` matching `list`, like `Element.closest`.
    pub fn closest(&self, id: NodeId, list: &SelectorList) -> Option<NodeId> {
        id.ancestors(&self.dom)
            .find(|node| self.matches(*node, list))
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in id.descendants(&self.dom) {
            if let Some(DOMNode {
                kind: NodeKind::Text { text },
                ..
            }) = self.node(node)
            {
                out.push_str(text);
            }
        }
        out
    }

    /// The document title with whitespace stripped and collapsed, as `document.title` reports it.
    pub fn title(&self) -> String {
        self.first_by_tag("title")
            .map(|node| {
                self.text_content(node)
                    .split_ascii_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}
