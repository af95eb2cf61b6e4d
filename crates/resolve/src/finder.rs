//! Bounded candidate collection.
//!
//! The cap keeps resolution cost independent of page size; callers get a
//! representative document-order sample, never an exhaustive list.

use pagemark_dom::{DocumentQuery, NodeId};
use pagemark_selector::{AttrExpectation, SelectorParts};

/// Hard upper bound on candidates per resolution call.
pub const MAX_CANDIDATES: usize = 100;

/// Collect up to [`MAX_CANDIDATES`] elements worth scoring against `parts`.
///
/// Base set: elements with the parsed tag, or every element when no tag was
/// extracted. When the base set overflows the cap and the selector carried
/// attribute expectations, attribute filtering narrows the set before the
/// cut, so the sample leans toward plausible matches instead of whatever
/// happened to come first.
#[must_use]
pub fn find_candidates<D: DocumentQuery>(doc: &D, parts: &SelectorParts) -> Vec<NodeId> {
    let mut base = match &parts.tag_name {
        Some(tag) => doc.elements_by_tag(tag),
        None => doc.all_elements(),
    };
    if base.len() > MAX_CANDIDATES && !parts.attributes.is_empty() {
        let exact: Vec<NodeId> = base
            .iter()
            .copied()
            .filter(|node| satisfies_attributes(doc, *node, parts, true))
            .collect();
        let narrowed = if exact.is_empty() {
            // Values may have rotated; try name presence alone.
            base.iter()
                .copied()
                .filter(|node| satisfies_attributes(doc, *node, parts, false))
                .collect()
        } else {
            exact
        };
        if !narrowed.is_empty() {
            base = narrowed;
        }
    }
    base.truncate(MAX_CANDIDATES);
    base
}

fn satisfies_attributes<D: DocumentQuery>(
    doc: &D,
    node: NodeId,
    parts: &SelectorParts,
    require_values: bool,
) -> bool {
    parts.attributes.iter().all(|(name, expectation)| {
        match (doc.attribute(node, name), expectation) {
            (Some(actual), AttrExpectation::Value(expected)) if require_values => actual == expected,
            (Some(_), _) => true,
            (None, _) => false,
        }
    })
}
