//! Owned HTML documents for the navigation engine.
//!
//! Pages are parsed with html5ever into an `indextree` arena, queried with a
//! small CSS selector subset, serialized back to markup, and copied between
//! documents when a fetched page is swapped into the live one.
#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod dom;
pub mod parser;
pub mod selectors;

pub use dom::{DOMNode, Document, NodeKind};
pub use indextree::NodeId;
pub use parser::parse_html;
pub use selectors::{SelectorList, parse_selector_list};
