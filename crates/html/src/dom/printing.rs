use core::fmt;

use super::{DOMNode, Document, NodeKind};
use indextree::NodeId;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text children are serialized verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn serialize_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    let Some(node) = doc.node(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Document => serialize_children(doc, id, false, out),
        NodeKind::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Comment { text } => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Text { text } => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &node.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            serialize_children(doc, id, RAW_TEXT_ELEMENTS.contains(&tag.as_str()), out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn serialize_children(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    for child in doc.children(id) {
        serialize_node(doc, child, raw_text, out);
    }
}

impl Document {
    /// Serialize `id` and its subtree, like `Element.outerHTML`.
    ///
    /// Attribute order is preserved from the source so that two copies of the
    /// same markup serialize to identical strings.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize_node(self, id, false, &mut out);
        out
    }

    /// Serialize only the children of `id`, like `Element.innerHTML`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw_text = self
            .tag_name(id)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        let mut out = String::new();
        serialize_children(self, id, raw_text, &mut out);
        out
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            Ok(())
        }

        fn fmt_node(
            doc: &Document,
            id: NodeId,
            f: &mut fmt::Formatter<'_>,
            depth: usize,
        ) -> fmt::Result {
            let Some(DOMNode { kind, attrs }) = doc.node(id) else {
                return Ok(());
            };
            match kind {
                NodeKind::Document => {
                    writeln!(f, "#document")?;
                }
                NodeKind::Doctype { name } => {
                    write_indent(f, depth)?;
                    writeln!(f, "<!DOCTYPE {name}>")?;
                }
                NodeKind::Comment { text } => {
                    write_indent(f, depth)?;
                    writeln!(f, "<!-- {} -->", text.trim())?;
                }
                NodeKind::Element { tag } => {
                    write_indent(f, depth)?;
                    write!(f, "<{tag}")?;
                    for (key, value) in attrs {
                        write!(f, " {key}={value:?}")?;
                    }
                    writeln!(f, ">")?;
                }
                NodeKind::Text { text } => {
                    // Skip pure-whitespace text nodes in the printer for cleaner output
                    if text.chars().all(char::is_whitespace) {
                        return Ok(());
                    }
                    write_indent(f, depth)?;
                    writeln!(f, "{text:?}")?;
                }
            }
            for child in doc.children(id) {
                fmt_node(doc, child, f, depth.saturating_add(1))?;
            }
            Ok(())
        }

        fmt_node(self, self.root, f, 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn outer_html_round_trips_script_markup() {
        let doc = Document::parse(
            "<html><body><script data-taxi-reload src=\"/a.js\">if (a < b && c) {}</script></body></html>",
        );
        let script = doc.query_selector("script").unwrap();
        assert_eq!(
            doc.outer_html(script),
            "<script data-taxi-reload=\"\" src=\"/a.js\">if (a < b && c) {}</script>"
        );
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let doc = Document::parse("<p title='say \"hi\"'>1 &lt; 2 &amp; 3</p><br>");
        let para = doc.query_selector("p").unwrap();
        assert_eq!(
            doc.outer_html(para),
            "<p title=\"say &quot;hi&quot;\">1 &lt; 2 &amp; 3</p>"
        );
        let br = doc.query_selector("br").unwrap();
        assert_eq!(doc.outer_html(br), "<br>");
    }
}
