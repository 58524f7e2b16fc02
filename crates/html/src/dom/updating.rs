//! Tree mutation: node creation, insertion, removal and cross-document copies.

use anyhow::{Error, anyhow};
use indextree::NodeId;

use super::{DOMNode, Document};

impl Document {
    /// Create a detached element owned by this document.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.dom.new_node(DOMNode::element(tag))
    }

    /// Create a detached text node owned by this document.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::text(text))
    }

    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    ///
    /// # Errors
    /// Returns an error if either node is unknown or `child` is an ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return Err(anyhow!("append_child: unknown node"));
        }
        child.detach(&mut self.dom);
        parent
            .checked_append(child, &mut self.dom)
            .map_err(|err| anyhow!("append_child failed: {err}"))
    }

    /// Insert `new_node` immediately before `sibling`.
    ///
    /// # Errors
    /// Returns an error if either node is unknown or the insertion would create a cycle.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) -> Result<(), Error> {
        if self.node(sibling).is_none() || self.node(new_node).is_none() {
            return Err(anyhow!("insert_before: unknown node"));
        }
        new_node.detach(&mut self.dom);
        sibling
            .checked_insert_before(new_node, &mut self.dom)
            .map_err(|err| anyhow!("insert_before failed: {err}"))
    }

    /// Swap `old` out of the tree for `replacement`, removing `old` and its subtree.
    ///
    /// # Errors
    /// Returns an error if `old` is detached or either node is unknown.
    pub fn replace_node(&mut self, old: NodeId, replacement: NodeId) -> Result<(), Error> {
        if self.parent(old).is_none() {
            return Err(anyhow!("replace_node: node has no parent"));
        }
        self.insert_before(old, replacement)?;
        self.remove(old);
        Ok(())
    }

    /// Remove `id` and its whole subtree from the document.
    pub fn remove(&mut self, id: NodeId) {
        if self.node(id).is_some() && id != self.root {
            id.remove_subtree(&mut self.dom);
        }
    }

    /// Deep-copy `node` from `source` into this document, like `document.importNode(node, true)`.
    ///
    /// The copy is detached; returns `None` if `node` does not exist in `source`.
    pub fn import_node(&mut self, source: &Document, node: NodeId) -> Option<NodeId> {
        let data = source.node(node)?.clone();
        let copy = self.dom.new_node(data);
        for child in source.children(node) {
            if let Some(child_copy) = self.import_node(source, child) {
                copy.append(child_copy, &mut self.dom);
            }
        }
        Some(copy)
    }

    /// Deep-copy `node` within this document. The copy is detached.
    pub fn duplicate_node(&mut self, node: NodeId) -> Option<NodeId> {
        let data = self.node(node)?.clone();
        let copy = self.dom.new_node(data);
        let children: Vec<NodeId> = self.children(node).collect();
        for child in children {
            if let Some(child_copy) = self.duplicate_node(child) {
                copy.append(child_copy, &mut self.dom);
            }
        }
        Some(copy)
    }

    /// Replace the children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.remove(child);
        }
        let text_node = self.create_text(text);
        id.append(text_node, &mut self.dom);
    }

    /// Set `document.title`, creating a `<title>` in `<head>` when the page has none.
    pub fn set_title(&mut self, title: &str) {
        if let Some(existing) = self.first_by_tag("title") {
            self.set_text_content(existing, title);
            return;
        }
        let Some(parent) = self.head().or_else(|| {
            self.element_descendants(self.root).next()
        }) else {
            return;
        };
        let element = self.create_element("title");
        self.set_text_content(element, title);
        parent.append(element, &mut self.dom);
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn import_node_copies_subtree_detached() {
        let source = Document::parse("<main data-taxi-view><h1>Hi</h1><p>there</p></main>");
        let main = source.query_selector("main").unwrap();

        let mut target = Document::parse("<div data-taxi></div>");
        let copy = target.import_node(&source, main).unwrap();
        assert!(!target.is_connected(copy));

        let wrapper = target.query_selector("[data-taxi]").unwrap();
        target.append_child(wrapper, copy).unwrap();
        assert!(target.is_connected(copy));
        assert_eq!(
            target.outer_html(copy),
            "<main data-taxi-view=\"\"><h1>Hi</h1><p>there</p></main>"
        );
    }

    #[test]
    fn replace_node_swaps_in_duplicate() {
        let mut doc = Document::parse("<body><script>run()</script><p>x</p></body>");
        let script = doc.query_selector("script").unwrap();
        let before = doc.outer_html(script);
        let fresh = doc.duplicate_node(script).unwrap();
        doc.replace_node(script, fresh).unwrap();

        assert!(doc.node(script).is_none());
        assert_eq!(doc.query_selector("script"), Some(fresh));
        assert_eq!(doc.outer_html(fresh), before);
    }

    #[test]
    fn set_title_updates_existing_title() {
        let mut doc = Document::parse("<html><head><title> Old </title></head><body></body></html>");
        doc.set_title("New page");
        assert_eq!(doc.title(), "New page");
    }
}
