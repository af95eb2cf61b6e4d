//! Multi-factor candidate scoring.
//!
//! Each signal contributes to both the accumulated score and the maximum
//! possible score, so the result self-normalizes against whichever signals
//! the selector and metadata actually carried: a tag-only selector can
//! still reach 100 on a tag match, and a missing text snapshot never drags
//! a candidate down.

use crate::config::ResolverConfig;
use crate::fuzzy::similarity;
use pagemark_dom::{DocumentQuery, NodeId};
use pagemark_selector::{AttrExpectation, SelectorParts};

/// Score `node` against the parsed selector and the optional remembered
/// text snapshot. Always in `[0, 100]`; 0 when no signal is available.
#[must_use]
pub fn score<D: DocumentQuery>(
    doc: &D,
    node: NodeId,
    parts: &SelectorParts,
    remembered_text: Option<&str>,
    config: &ResolverConfig,
) -> u8 {
    let mut accumulated = 0.0f64;
    let mut max_possible = 0.0f64;

    if let Some(tag) = &parts.tag_name {
        max_possible += config.weight_tag;
        if doc.tag_name(node) == Some(tag.as_str()) {
            accumulated += config.weight_tag;
        }
    }

    if !parts.classes.is_empty() {
        max_possible += config.weight_classes;
        let present = doc.classes(node);
        let matched = parts
            .classes
            .iter()
            .filter(|class| present.contains(&class.as_str()))
            .count();
        accumulated += config.weight_classes * matched as f64 / parts.classes.len() as f64;
    }

    for (name, expectation) in &parts.attributes {
        max_possible += config.weight_attribute;
        match (doc.attribute(node, name), expectation) {
            (Some(_), AttrExpectation::Present) => accumulated += config.weight_attribute,
            (Some(actual), AttrExpectation::Value(expected)) => {
                if actual == expected {
                    accumulated += config.weight_attribute;
                } else {
                    accumulated += config.weight_attribute
                        * config.partial_attribute_factor
                        * similarity(expected, actual);
                }
            }
            (None, _) => {}
        }
    }

    if let Some(id) = &parts.id {
        max_possible += config.weight_id;
        if let Some(actual) = doc.element_id(node) {
            // Equality first: ids shorter than the similarity minimum must
            // still score as exact matches.
            if actual == id {
                accumulated += config.weight_id;
            } else {
                accumulated += config.weight_id * similarity(id, actual);
            }
        }
    }

    if let Some(text) = remembered_text.map(str::trim).filter(|t| !t.is_empty()) {
        max_possible += config.weight_text;
        let candidate_text = doc.text_content(node);
        let trimmed = candidate_text.trim();
        let head: String = trimmed.chars().take(config.text_compare_len).collect();
        accumulated += config.weight_text * similarity(text, &head);
    }

    if max_possible <= 0.0 {
        return 0;
    }
    let normalized = (100.0 * accumulated / max_possible).round();
    normalized.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemark_dom::{parse_html, Document};
    use pagemark_selector::parse;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn scored(html: &str, target: &str, selector: &str, text: Option<&str>) -> u8 {
        let doc = parse_html(html);
        let node = doc.query_selector_all(target).unwrap()[0];
        score(&doc, node, &parse(selector), text, &ResolverConfig::default())
    }

    #[test]
    fn perfect_match_on_available_signals_scores_full() {
        let html = r#"<div id="note" class="box warm" data-kind="pin">hello world</div>"#;
        assert_eq!(
            scored(html, "div", "div#note.box.warm[data-kind=\"pin\"]", None),
            100
        );
        // A tag-only selector still normalizes to full marks on a tag match.
        assert_eq!(scored(html, "div", "div", None), 100);
    }

    #[test]
    fn no_signal_scores_zero() {
        let html = "<p>text</p>";
        assert_eq!(scored(html, "p", "", None), 0);
        assert_eq!(scored(html, "p", "~~~", None), 0);
    }

    #[test]
    fn exact_attribute_outranks_partial_value() {
        let html = concat!(
            r#"<a data-ref="section-42">x</a>"#,
            r#"<a data-ref="section-57">y</a>"#,
        );
        let exact = scored(html, "a:nth-of-type(1)", "a[data-ref=\"section-42\"]", None);
        let partial = scored(html, "a:nth-of-type(2)", "a[data-ref=\"section-42\"]", None);
        assert!(exact > partial, "{exact} > {partial}");
        assert!(partial > 0, "partial value similarity still counts");
    }

    #[test]
    fn rotated_id_scores_between_exact_and_absent() {
        let html = concat!(
            r#"<section id="comp-42">a</section>"#,
            r#"<section id="comp-57">b</section>"#,
            r#"<section>c</section>"#,
        );
        let exact = scored(html, "#comp-42", "#comp-42", None);
        let rotated = scored(html, "#comp-57", "#comp-42", None);
        let absent = scored(html, "section:nth-of-type(3)", "#comp-42", None);
        assert!(exact > rotated, "{exact} > {rotated}");
        assert!(rotated > absent, "{rotated} > {absent}");
    }

    #[test]
    fn remembered_text_separates_identical_markup() {
        let html = concat!(
            "<li class=\"item\">Buy milk</li>",
            "<li class=\"item\">Walk dog</li>",
        );
        let right = scored(html, "li:nth-of-type(1)", "li.item", Some("Buy milk"));
        let wrong = scored(html, "li:nth-of-type(2)", "li.item", Some("Buy milk"));
        assert!(right > wrong, "{right} > {wrong}");
    }

    #[test]
    fn class_overlap_is_fractional() {
        let html = concat!(
            "<div class=\"a b c\">x</div>",
            "<div class=\"a\">y</div>",
            "<div class=\"z\">y</div>",
        );
        let full = scored(html, "div:nth-of-type(1)", ".a.b.c", None);
        let third = scored(html, "div:nth-of-type(2)", ".a.b.c", None);
        let none = scored(html, "div:nth-of-type(3)", ".a.b.c", None);
        assert!(full > third, "{full} > {third}");
        assert!(third > none, "{third} > {none}");
        assert_eq!(none, 0);
    }

    #[test]
    fn blank_metadata_text_adds_no_expectation() {
        let html = "<p class=\"lead\">body</p>";
        let with_blank = scored(html, "p", "p.lead", Some("   "));
        let without = scored(html, "p", "p.lead", None);
        assert_eq!(with_blank, without);
    }

    proptest! {
        #[test]
        fn proptest_score_is_clamped(selector in ".{0,60}", text in ".{0,60}") {
            let mut doc = Document::new();
            let root = doc.root();
            let node = doc.append_element(
                root,
                pagemark_dom::ElementInit::new("div").id("x1").class("alpha beta"),
            );
            let value = score(
                &doc,
                node,
                &parse(&selector),
                Some(text.as_str()),
                &ResolverConfig::default(),
            );
            prop_assert!(value <= 100);
        }
    }
}
