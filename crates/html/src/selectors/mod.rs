//! Selectors Level 3 subset used to find wrappers, view roots, scripts and links.
//! Spec: <https://www.w3.org/TR/selectors-3/>
//!
//! Supported:
//! - Type, class, id and universal selectors
//! - Attribute presence, `=`, `^=`, `$=`, `*=` (quoted, unquoted or backslash-escaped values)
//! - `:not()` over a compound selector
//! - Combinators: descendant, child, adjacent sibling, general sibling

mod matcher;
mod parser;

use indextree::NodeId;

use crate::dom::Document;

pub use matcher::{matches_complex, matches_compound, matches_selector_list};
pub use parser::{parse_complex_selector, parse_selector_list};

/// An adapter that abstracts DOM access for selector matching.
pub trait ElementAdapter {
    type Handle: Copy + Eq;

    /// Parent element if any.
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Previous sibling element, skipping non-element nodes.
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Tag name in ASCII lowercase.
    fn tag_name(&self, element: Self::Handle) -> &str;

    /// Returns the attribute value if present.
    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;

    /// True if the element has the given class token.
    fn has_class(&self, element: Self::Handle, class: &str) -> bool {
        self.attr(element, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|token| token == class))
    }
}

impl ElementAdapter for Document {
    type Handle = NodeId;

    fn parent(&self, element: NodeId) -> Option<NodeId> {
        Self::parent(self, element).filter(|parent| self.tag_name(*parent).is_some())
    }

    fn previous_sibling_element(&self, element: NodeId) -> Option<NodeId> {
        self.previous_element_sibling(element)
    }

    fn tag_name(&self, element: NodeId) -> &str {
        Self::tag_name(self, element).unwrap_or_default()
    }

    fn attr(&self, element: NodeId, name: &str) -> Option<&str> {
        Self::attr(self, element, name)
    }
}

/// How an attribute selector compares the attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrOperator {
    /// `[name]`
    Exists,
    /// `[name=value]`
    Equals,
    /// `[name^=value]`
    Prefix,
    /// `[name$=value]`
    Suffix,
    /// `[name*=value]`
    Substring,
}

/// Simple selectors (subset).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    Type(String),
    Class(String),
    IdSelector(String),
    Attr {
        name: String,
        op: AttrOperator,
        value: String,
    },
    /// `:not(compound)`
    Not(Vec<SimpleSelector>),
    /// Universal selector '*'.
    Universal,
}

/// A compound selector is a sequence of simple selectors (no combinators).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// Combinators between compounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

/// A complex selector is one or more compounds separated by combinators.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

/// A selector list separated by commas.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}
