use crate::config::ResolverConfig;
use crate::finder::find_candidates;
use crate::scorer::score;
use lru::LruCache;
use pagemark_dom::{DocumentQuery, NodeId};
use pagemark_selector::{parse, SelectorParts};
use std::num::NonZeroUsize;

/// Fuzzy resolution engine: selector string plus remembered text in,
/// best-matching element out.
///
/// Owns its parsed-selector cache; construct one per composition root and
/// pass it where needed instead of reaching for process-wide state.
#[derive(Debug)]
pub struct Resolver {
    config: ResolverConfig,
    parse_cache: LruCache<String, SelectorParts>,
}

impl Resolver {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        let capacity = NonZeroUsize::new(config.parse_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            parse_cache: LruCache::new(capacity),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Parsed parts for a selector, cached across calls. Resolution runs
    /// inside mutation callbacks, where the same persisted selectors come
    /// back batch after batch.
    pub fn parts(&mut self, selector: &str) -> SelectorParts {
        if let Some(parts) = self.parse_cache.get(selector) {
            return parts.clone();
        }
        let parts = parse(selector);
        self.parse_cache.put(selector.to_string(), parts.clone());
        parts
    }

    /// Best acceptable fuzzy match for a selector that no longer resolves
    /// exactly. Returns `None` below the acceptance threshold: guessing is
    /// worse than orphaning.
    ///
    /// Ties break toward earlier document order.
    pub fn find_best_match<D: DocumentQuery>(
        &mut self,
        doc: &D,
        selector: &str,
        remembered_text: Option<&str>,
    ) -> Option<NodeId> {
        let parts = self.parts(selector);
        if parts.is_empty() {
            return None;
        }
        let candidates = find_candidates(doc, &parts);
        let (node, best) = self.best_scored(doc, &candidates, &parts, remembered_text)?;
        if best >= self.config.min_accept_score {
            log::debug!("fuzzy match for {selector:?}: node {node:?} at score {best}");
            Some(node)
        } else {
            log::debug!(
                "no acceptable match for {selector:?}: best score {best} below {}",
                self.config.min_accept_score
            );
            None
        }
    }

    /// Score a fixed candidate set (e.g. the multi-match result of an exact
    /// query) and return the acceptable winner, if any.
    pub fn best_among<D: DocumentQuery>(
        &mut self,
        doc: &D,
        candidates: &[NodeId],
        selector: &str,
        remembered_text: Option<&str>,
    ) -> Option<NodeId> {
        let parts = self.parts(selector);
        let (node, best) = self.best_scored(doc, candidates, &parts, remembered_text)?;
        (best >= self.config.min_accept_score).then_some(node)
    }

    fn best_scored<D: DocumentQuery>(
        &self,
        doc: &D,
        candidates: &[NodeId],
        parts: &SelectorParts,
        remembered_text: Option<&str>,
    ) -> Option<(NodeId, u8)> {
        let mut best: Option<(NodeId, u8)> = None;
        for node in candidates {
            let value = score(doc, *node, parts, remembered_text, &self.config);
            // Strict comparison keeps the earliest candidate on ties.
            if best.is_none_or(|(_, current)| value > current) {
                best = Some((*node, value));
            }
        }
        best
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemark_dom::parse_html;
    use pretty_assertions::assert_eq;

    #[test]
    fn recovers_element_after_id_rotation() {
        // The persisted selector references the pre-render id.
        let doc = parse_html(
            r#"<main>
                 <section id="comp-57" class="panel">Quarterly report</section>
                 <section class="panel">Other panel</section>
               </main>"#,
        );
        let mut resolver = Resolver::default();
        let found = resolver.find_best_match(
            &doc,
            "section#comp-42.panel",
            Some("Quarterly report"),
        );
        let expected = doc.query_selector_all("#comp-57").unwrap()[0];
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn refuses_unrelated_documents() {
        let doc = parse_html("<article><h1>Totally different page</h1></article>");
        let mut resolver = Resolver::default();
        let found = resolver.find_best_match(
            &doc,
            "button#save-note.primary[data-testid=\"save\"]",
            Some("Save note"),
        );
        assert_eq!(found, None);
    }

    #[test]
    fn empty_selector_never_matches() {
        let doc = parse_html("<p>x</p>");
        let mut resolver = Resolver::default();
        assert_eq!(resolver.find_best_match(&doc, "", None), None);
        assert_eq!(resolver.find_best_match(&doc, "   ", Some("x")), None);
    }

    #[test]
    fn ties_resolve_to_earliest_in_document_order() {
        let doc = parse_html(
            "<ul><li class=\"item\">a</li><li class=\"item\">b</li><li class=\"item\">c</li></ul>",
        );
        let mut resolver = Resolver::default();
        let found = resolver.find_best_match(&doc, "li.item", None);
        let first = doc.query_selector_all("li").unwrap()[0];
        assert_eq!(found, Some(first));
    }

    #[test]
    fn best_among_prefers_scored_winner_within_the_given_set() {
        let doc = parse_html(
            "<ul>\
               <li class=\"item\">Buy milk substitute</li>\
               <li class=\"item\">Buy milk</li>\
             </ul>",
        );
        let items = doc.query_selector_all("li.item").unwrap();
        let mut resolver = Resolver::default();
        let found = resolver.best_among(&doc, &items, "li.item", Some("Buy milk"));
        assert_eq!(found, Some(items[1]));
    }

    #[test]
    fn threshold_is_tunable() {
        let doc = parse_html("<div class=\"a\">x</div>");
        let strict = ResolverConfig {
            min_accept_score: 100,
            ..Default::default()
        };
        // Selector with classes a+b: only half the class weight matches.
        let mut resolver = Resolver::new(strict);
        assert_eq!(resolver.find_best_match(&doc, "div.a.b", None), None);

        let lenient = ResolverConfig {
            min_accept_score: 10,
            ..Default::default()
        };
        let mut resolver = Resolver::new(lenient);
        assert!(resolver.find_best_match(&doc, "div.a.b", None).is_some());
    }

    #[test]
    fn parse_cache_returns_identical_parts() {
        let mut resolver = Resolver::default();
        let first = resolver.parts("div.note[data-id=\"n1\"]");
        let second = resolver.parts("div.note[data-id=\"n1\"]");
        assert_eq!(first, second);
    }
}
