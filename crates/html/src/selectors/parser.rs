//! CSS selector parsing.

use super::{AttrOperator, Combinator, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector};
use core::mem::take;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Internal tokenizer token kinds.
enum Tok {
    /// A combinator token like child/adjacent/general sibling.
    Combinator(Combinator),
    /// Whitespace that implies a descendant combinator.
    DescendantWS,
    /// A simple selector token.
    Simple(SimpleSelector),
}

/// Tokenizer over a selector string.
struct SelectorTokenizer {
    /// Selector characters.
    input: Vec<char>,
    /// Current cursor index into `input`.
    index: usize,
    /// Whether we should emit a descendant whitespace token on `next()` call.
    pending_whitespace: bool,
}

impl SelectorTokenizer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            index: 0,
            pending_whitespace: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.index).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Return the next selector token, if any.
    fn next(&mut self) -> Option<Tok> {
        self.skip_whitespace_descendant();
        let current = self.peek()?;
        if self.pending_whitespace {
            self.pending_whitespace = false;
            return Some(Tok::DescendantWS);
        }
        Some(match current {
            '*' => {
                self.bump();
                Tok::Simple(SimpleSelector::Universal)
            }
            '.' => {
                self.bump();
                Tok::Simple(SimpleSelector::Class(self.consume_ident()))
            }
            '#' => {
                self.bump();
                Tok::Simple(SimpleSelector::IdSelector(self.consume_ident()))
            }
            '[' => Tok::Simple(self.consume_attr()),
            ':' => Tok::Simple(self.consume_pseudo()),
            '>' => {
                self.bump();
                self.skip_spaces();
                Tok::Combinator(Combinator::Child)
            }
            '+' => {
                self.bump();
                self.skip_spaces();
                Tok::Combinator(Combinator::AdjacentSibling)
            }
            '~' => {
                self.bump();
                self.skip_spaces();
                Tok::Combinator(Combinator::GeneralSibling)
            }
            _ => {
                let ident = self.consume_ident();
                if ident.is_empty() {
                    // Unknown byte: skip it so the tokenizer always makes progress.
                    self.bump();
                }
                Tok::Simple(SimpleSelector::Type(ident))
            }
        })
    }

    /// Skip whitespace and mark that a descendant combinator should be emitted next.
    fn skip_whitespace_descendant(&mut self) {
        let mut saw = false;
        while self.peek().is_some_and(char::is_whitespace) {
            saw = true;
            self.bump();
        }
        if saw && !matches!(self.peek(), Some('>' | '+' | '~')) {
            self.pending_whitespace = true;
        }
    }

    /// Consume an identifier of alphanumerics, '-', '_' and escaped characters, lowercased.
    fn consume_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.bump();
                }
            } else if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                out.push(ch.to_ascii_lowercase());
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    /// Parse an attribute selector: `[name]` or `[name<op>value]` (quoted or unquoted).
    fn consume_attr(&mut self) -> SimpleSelector {
        // skip '['
        self.bump();
        self.skip_spaces();
        let name = self.consume_ident();
        self.skip_spaces();
        let op = match self.peek() {
            Some('=') => AttrOperator::Equals,
            Some('^') => AttrOperator::Prefix,
            Some('$') => AttrOperator::Suffix,
            Some('*') => AttrOperator::Substring,
            _ => AttrOperator::Exists,
        };
        let value = if op == AttrOperator::Exists {
            String::new()
        } else {
            if op != AttrOperator::Equals {
                self.bump();
            }
            // skip '='
            self.bump();
            self.skip_spaces();
            match self.peek() {
                Some(quote @ ('"' | '\'')) => {
                    self.bump();
                    self.consume_quoted_attr_value(quote)
                }
                _ => self.consume_unquoted_attr_value(),
            }
        };
        self.skip_spaces();
        if self.peek() == Some(']') {
            self.bump();
        }
        SimpleSelector::Attr { name, op, value }
    }

    /// Consume an unquoted attribute value until whitespace or a closing bracket.
    fn consume_unquoted_attr_value(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == ']' {
                break;
            }
            self.bump();
            if ch == '\\' {
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.bump();
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Consume a quoted attribute value until the matching quote.
    fn consume_quoted_attr_value(&mut self, quote: char) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            self.bump();
            if ch == quote {
                break;
            }
            out.push(ch);
        }
        out
    }

    /// Parse `:not(...)`. Other pseudo-classes never match.
    fn consume_pseudo(&mut self) -> SimpleSelector {
        // skip ':'
        self.bump();
        let name = self.consume_ident();
        if self.peek() != Some('(') {
            return SimpleSelector::Not(vec![SimpleSelector::Universal]);
        }
        self.bump();
        let start = self.index;
        let mut depth = 1_usize;
        while let Some(ch) = self.peek() {
            match ch {
                '(' => depth = depth.saturating_add(1),
                ')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.bump();
        }
        let inner: String = self
            .input
            .get(start..self.index)
            .unwrap_or_default()
            .iter()
            .collect();
        // skip ')'
        self.bump();
        if name != "not" {
            return SimpleSelector::Not(vec![SimpleSelector::Universal]);
        }
        SimpleSelector::Not(parse_complex_selector(inner.trim()).first.simples)
    }

    /// Skip whitespace.
    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }
}

/// Parse a selector list from CSS text.
pub fn parse_selector_list(input: &str) -> SelectorList {
    let mut list = SelectorList::default();
    for part in split_top_level_commas(input) {
        let sel = parse_complex_selector(part.trim());
        if !sel.first.simples.is_empty() || !sel.rest.is_empty() {
            list.selectors.push(sel);
        }
    }
    list
}

/// Split on commas that are not nested inside parentheses or brackets.
fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (index, ch) in input.char_indices() {
        match ch {
            '(' | '[' => depth = depth.saturating_add(1),
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..index]);
                start = index.saturating_add(1);
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Parse one complex selector (very permissive, minimal error handling).
pub fn parse_complex_selector(input: &str) -> ComplexSelector {
    let mut tokens = SelectorTokenizer::new(input);
    let mut current = CompoundSelector::default();
    let mut first = None;
    let mut rest: Vec<(Combinator, CompoundSelector)> = Vec::new();
    let mut pending_combinator: Option<Combinator> = None;

    while let Some(token) = tokens.next() {
        match token {
            // A leading combinator has nothing on its left; ignore it.
            Tok::Combinator(_) | Tok::DescendantWS if current.simples.is_empty() => {}
            Tok::Combinator(comb) => {
                push_compound(&mut first, &mut rest, pending_combinator, take(&mut current));
                pending_combinator = Some(comb);
            }
            Tok::DescendantWS => {
                push_compound(&mut first, &mut rest, pending_combinator, take(&mut current));
                pending_combinator = Some(Combinator::Descendant);
            }
            Tok::Simple(simple) => {
                current.simples.push(simple);
            }
        }
    }

    if !current.simples.is_empty() {
        push_compound(&mut first, &mut rest, pending_combinator, current);
    }

    ComplexSelector {
        first: first.unwrap_or_default(),
        rest,
    }
}

fn push_compound(
    first: &mut Option<CompoundSelector>,
    rest: &mut Vec<(Combinator, CompoundSelector)>,
    combinator: Option<Combinator>,
    compound: CompoundSelector,
) {
    if first.is_none() {
        *first = Some(compound);
    } else {
        rest.push((combinator.unwrap_or(Combinator::Descendant), compound));
    }
}
