//! HTML5 parsing using html5ever.

mod sink;

use html5ever::tendril::TendrilSink as _;
use html5ever::{ParseOpts, parse_document};

use crate::dom::Document;
use crate::parser::sink::ArenaSink;

/// Parse a complete HTML document into an owned [`Document`].
///
/// html5ever recovers from malformed markup, so this never fails; fragments
/// are wrapped in the implied `html`/`head`/`body` elements.
pub fn parse_html(html: &str) -> Document {
    parse_document(ArenaSink::default(), ParseOpts::default()).one(html)
}

#[cfg(test)]
mod tests {
    use super::parse_html;

    fn init_logging() {
        drop(env_logger::builder().is_test(true).try_init());
    }

    #[test]
    fn parses_title_and_view_root() {
        init_logging();
        let doc = parse_html(
            "<!DOCTYPE html><html><head><title>  About\n us </title></head>\
             <body><div data-taxi><main data-taxi-view=\"about\">x</main></div></body></html>",
        );
        assert_eq!(doc.title(), "About us");
        let view = doc.query_selector("[data-taxi-view]").unwrap();
        assert_eq!(doc.attr(view, "data-taxi-view"), Some("about"));
        assert_eq!(doc.tag_name(doc.parent(view).unwrap()), Some("div"));
    }

    #[test]
    fn adjacent_text_is_merged() {
        let doc = parse_html("<p>a&amp;b</p>");
        let para = doc.query_selector("p").unwrap();
        assert_eq!(doc.children(para).count(), 1);
        assert_eq!(doc.text_content(para), "a&b");
    }

    #[test]
    fn misnested_markup_is_recovered() {
        init_logging();
        let doc = parse_html("<table><tr><td>cell</td></tr></table><p>one<p>two");
        assert_eq!(doc.query_selector_all("p").len(), 2);
        assert!(doc.query_selector("tbody").is_some());
    }
}
