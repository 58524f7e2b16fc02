//! CSS selector matching engine, right-to-left.

use super::{
    AttrOperator, Combinator, ComplexSelector, CompoundSelector, ElementAdapter, SelectorList,
    SimpleSelector,
};

/// Match a selector list against an element.
pub fn matches_selector_list<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    list: &SelectorList,
) -> bool {
    list.selectors
        .iter()
        .any(|selector_item| matches_complex(adapter, element, selector_item))
}

/// Match a complex selector against an element.
pub fn matches_complex<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
) -> bool {
    // Compounds right-to-left; each combinator relates a compound to the one on its right.
    let mut compounds: Vec<&CompoundSelector> = Vec::with_capacity(sel.rest.len().saturating_add(1));
    compounds.push(&sel.first);
    compounds.extend(sel.rest.iter().map(|pair| &pair.1));
    let combinators: Vec<Combinator> = sel.rest.iter().map(|pair| pair.0).collect();
    match_from(adapter, element, &compounds, &combinators)
}

/// Match `compounds[..=last]` with `element` bound to the last compound, backtracking
/// across descendant and general-sibling combinators.
fn match_from<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    compounds: &[&CompoundSelector],
    combinators: &[Combinator],
) -> bool {
    let Some((last, left_compounds)) = compounds.split_last() else {
        return true;
    };
    if !matches_compound(adapter, element, last) {
        return false;
    }
    let Some((combinator, left_combinators)) = combinators.split_last() else {
        return true;
    };
    match combinator {
        Combinator::Child => adapter
            .parent(element)
            .is_some_and(|parent| match_from(adapter, parent, left_compounds, left_combinators)),
        Combinator::AdjacentSibling => adapter
            .previous_sibling_element(element)
            .is_some_and(|prev| match_from(adapter, prev, left_compounds, left_combinators)),
        Combinator::Descendant => {
            let mut current = adapter.parent(element);
            while let Some(ancestor) = current {
                if match_from(adapter, ancestor, left_compounds, left_combinators) {
                    return true;
                }
                current = adapter.parent(ancestor);
            }
            false
        }
        Combinator::GeneralSibling => {
            let mut current = adapter.previous_sibling_element(element);
            while let Some(sibling) = current {
                if match_from(adapter, sibling, left_compounds, left_combinators) {
                    return true;
                }
                current = adapter.previous_sibling_element(sibling);
            }
            false
        }
    }
}

/// Match a compound selector against a single element.
pub fn matches_compound<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    compound: &CompoundSelector,
) -> bool {
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(adapter, element, simple))
}

fn matches_simple<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    simple: &SimpleSelector,
) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(type_name) => {
            type_name.is_empty() || adapter.tag_name(element) == type_name.as_str()
        }
        SimpleSelector::Class(class_name) => adapter.has_class(element, class_name),
        SimpleSelector::IdSelector(id_value) => adapter
            .attr(element, "id")
            .is_some_and(|value| value == id_value.as_str()),
        SimpleSelector::Attr { name, op, value } => {
            adapter
                .attr(element, name)
                .is_some_and(|attr_value| match op {
                    AttrOperator::Exists => true,
                    AttrOperator::Equals => attr_value == value.as_str(),
                    AttrOperator::Prefix => !value.is_empty() && attr_value.starts_with(value.as_str()),
                    AttrOperator::Suffix => !value.is_empty() && attr_value.ends_with(value.as_str()),
                    AttrOperator::Substring => !value.is_empty() && attr_value.contains(value.as_str()),
                })
        }
        SimpleSelector::Not(inner) => !inner
            .iter()
            .all(|simple_inner| matches_simple(adapter, element, simple_inner)),
    }
}
