use crate::config::EngineConfig;
use crate::error::{AnchorError, Result};
use crate::persist::{DiscardSink, PersistenceSink, SelectorUpdate};
use crate::record::{AnchorRecord, AnchorState};
use pagemark_dom::{DocumentQuery, NodeId};
use pagemark_resolve::Resolver;
use pagemark_selector::{sanitize, SelectorGenerator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// How one reconciliation pass settled a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    /// The stored selector matched exactly one element.
    ExactUnique,
    /// Several matches; the remembered text snapshot singled one out.
    DisambiguatedByText,
    /// Several matches; fuzzy scoring singled one out.
    DisambiguatedByScore,
    /// Several matches and no separating signal: the first was taken and the
    /// record flagged for another try on the next batch.
    AmbiguousFirst,
    /// Zero exact matches; fuzzy search recovered an element and the
    /// regenerated selector went to the persistence sink.
    FuzzyRecovered,
    /// Zero exact matches inside the creation grace window; the record stays
    /// Pending until the next batch.
    GracePending,
    /// A new selector was generated from a user-picked element (note
    /// creation or manual reanchor).
    Generated,
    /// Nothing acceptable anywhere in the document.
    Orphaned,
}

/// One record transition, reported so the host can move whatever it hangs
/// off the anchor element (highlight, visibility observer) to the new node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorEvent {
    pub note_id: String,
    pub outcome: ResolveOutcome,
    pub previous: Option<NodeId>,
    pub current: Option<NodeId>,
}

struct Correction {
    selector: String,
    anchor_text: String,
}

enum Decision {
    Attach {
        node: NodeId,
        outcome: ResolveOutcome,
        corrected: Option<Correction>,
    },
    Park,
    Orphan,
}

/// Registry of anchor records plus the transition functions that move them
/// between `Pending`, `Resolved` and `Orphaned`.
///
/// All per-note bookkeeping lives here, keyed by note id; batches process
/// records in id order. The engine owns its resolver and generator, so two
/// engines never share cache or scoring state.
pub struct AnchorEngine {
    config: EngineConfig,
    records: BTreeMap<String, AnchorRecord>,
    resolver: Resolver,
    generator: SelectorGenerator,
    sink: Box<dyn PersistenceSink>,
}

impl AnchorEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sink(config, Box::new(DiscardSink))
    }

    #[must_use]
    pub fn with_sink(config: EngineConfig, sink: Box<dyn PersistenceSink>) -> Self {
        let resolver = Resolver::new(config.resolver.clone());
        let generator = SelectorGenerator::new(config.generator.clone());
        Self {
            config,
            records: BTreeMap::new(),
            resolver,
            generator,
            sink,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a note loaded from persistence, or apply an external update
    /// to an existing one. The record starts Pending; call [`Self::resolve`]
    /// or let the next mutation batch pick it up.
    pub fn insert_loaded(&mut self, note_id: &str, selector: &str, anchor_text: &str) {
        let snapshot = anchor_text
            .trim()
            .chars()
            .take(self.config.anchor_text_len)
            .collect();
        let record = AnchorRecord::new(
            note_id.to_string(),
            selector.trim().to_string(),
            snapshot,
            false,
        );
        self.records.insert(note_id.to_string(), record);
    }

    /// Register a brand-new note anchored to a live element: generates the
    /// selector, snapshots the element text, pushes both to the persistence
    /// sink, and starts the record out Resolved.
    pub fn insert_created<D: DocumentQuery>(
        &mut self,
        doc: &D,
        note_id: &str,
        node: NodeId,
    ) -> Result<AnchorEvent> {
        if self.records.contains_key(note_id) {
            return Err(AnchorError::DuplicateNote(note_id.to_string()));
        }
        let selector = self
            .generator
            .generate(doc, node)
            .ok_or(AnchorError::NotAnchorable)?;
        let anchor_text = self.snapshot_text(doc, node);
        let mut record = AnchorRecord::new(note_id.to_string(), selector, anchor_text, true);
        record.resolved = Some(node);
        record.state = AnchorState::Resolved;
        push_update(
            self.sink.as_mut(),
            SelectorUpdate {
                note_id: record.note_id.clone(),
                selector: record.selector.clone(),
                anchor_text: record.anchor_text.clone(),
            },
        );
        self.records.insert(note_id.to_string(), record);
        Ok(AnchorEvent {
            note_id: note_id.to_string(),
            outcome: ResolveOutcome::Generated,
            previous: None,
            current: Some(node),
        })
    }

    /// Run initial resolution for one record against the given document.
    pub fn resolve<D: DocumentQuery>(&mut self, doc: &D, note_id: &str) -> Result<AnchorEvent> {
        self.reconcile(doc, note_id)
            .ok_or_else(|| AnchorError::UnknownNote(note_id.to_string()))
    }

    /// Process one "something changed" notification from the host's DOM
    /// change feed: re-resolve every record whose anchor is missing, still
    /// pending, orphaned, or parked on an ambiguous pick. Settled records
    /// are left alone. Returns the transitions in note-id order.
    pub fn on_dom_change_batch<D: DocumentQuery>(&mut self, doc: &D) -> Vec<AnchorEvent> {
        let note_ids: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| needs_attention(record, doc))
            .map(|(id, _)| id.clone())
            .collect();
        let mut events = Vec::with_capacity(note_ids.len());
        for note_id in &note_ids {
            if let Some(event) = self.reconcile(doc, note_id) {
                events.push(event);
            }
        }
        events
    }

    /// Replace a record's anchor with a user-picked element: brand-new
    /// selector, fresh text snapshot, forced Resolved, update persisted.
    pub fn reanchor<D: DocumentQuery>(
        &mut self,
        doc: &D,
        note_id: &str,
        node: NodeId,
    ) -> Result<AnchorEvent> {
        if !self.records.contains_key(note_id) {
            return Err(AnchorError::UnknownNote(note_id.to_string()));
        }
        let selector = self
            .generator
            .generate(doc, node)
            .ok_or(AnchorError::NotAnchorable)?;
        let anchor_text = self.snapshot_text(doc, node);
        let Some(record) = self.records.get_mut(note_id) else {
            return Err(AnchorError::UnknownNote(note_id.to_string()));
        };
        let previous = record.resolved;
        record.selector = selector;
        record.anchor_text = anchor_text;
        record.resolved = Some(node);
        record.state = AnchorState::Resolved;
        // The snapshot was just taken, so the record earns the same grace a
        // newly created one gets.
        record.created_in_session = true;
        record.added_at = Instant::now();
        record.needs_disambiguation = false;
        push_update(
            self.sink.as_mut(),
            SelectorUpdate {
                note_id: record.note_id.clone(),
                selector: record.selector.clone(),
                anchor_text: record.anchor_text.clone(),
            },
        );
        Ok(AnchorEvent {
            note_id: note_id.to_string(),
            outcome: ResolveOutcome::Generated,
            previous,
            current: Some(node),
        })
    }

    /// Destroy a record (note deleted). Returns the final record, if any.
    pub fn remove(&mut self, note_id: &str) -> Option<AnchorRecord> {
        self.records.remove(note_id)
    }

    #[must_use]
    pub fn record(&self, note_id: &str) -> Option<&AnchorRecord> {
        self.records.get(note_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &AnchorRecord> {
        self.records.values()
    }

    /// Records currently without an acceptable anchor, in note-id order.
    pub fn orphans(&self) -> impl Iterator<Item = &AnchorRecord> {
        self.records.values().filter(|record| record.is_orphaned())
    }

    #[must_use]
    pub fn orphan_count(&self) -> usize {
        self.orphans().count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reconcile<D: DocumentQuery>(&mut self, doc: &D, note_id: &str) -> Option<AnchorEvent> {
        let (selector, anchor_text, in_grace) = {
            let record = self.records.get(note_id)?;
            let in_grace = record.created_in_session
                && record.added_at.elapsed() < self.config.creation_grace;
            (record.selector.clone(), record.anchor_text.clone(), in_grace)
        };
        let decision = self.decide(doc, &selector, &anchor_text, in_grace);

        let record = self.records.get_mut(note_id)?;
        let previous = record.resolved;
        let (outcome, current) = match decision {
            Decision::Attach {
                node,
                outcome,
                corrected,
            } => {
                record.state = AnchorState::Resolved;
                record.resolved = Some(node);
                record.needs_disambiguation = outcome == ResolveOutcome::AmbiguousFirst;
                if let Some(correction) = corrected {
                    record.selector = correction.selector;
                    record.anchor_text = correction.anchor_text;
                    push_update(
                        self.sink.as_mut(),
                        SelectorUpdate {
                            note_id: record.note_id.clone(),
                            selector: record.selector.clone(),
                            anchor_text: record.anchor_text.clone(),
                        },
                    );
                }
                (outcome, Some(node))
            }
            Decision::Park => {
                record.state = AnchorState::Pending;
                record.resolved = None;
                (ResolveOutcome::GracePending, None)
            }
            Decision::Orphan => {
                record.state = AnchorState::Orphaned;
                record.resolved = None;
                record.needs_disambiguation = false;
                (ResolveOutcome::Orphaned, None)
            }
        };
        Some(AnchorEvent {
            note_id: note_id.to_string(),
            outcome,
            previous,
            current,
        })
    }

    fn decide<D: DocumentQuery>(
        &mut self,
        doc: &D,
        selector: &str,
        anchor_text: &str,
        in_grace: bool,
    ) -> Decision {
        let Some(clean) = sanitize(selector) else {
            log::warn!("stored selector failed validation, orphaning: {selector:?}");
            return Decision::Orphan;
        };
        let matches = match doc.query_selector_all(&clean) {
            Ok(matches) => matches,
            Err(err) => {
                log::warn!("query failed for {clean:?}: {err}");
                Vec::new()
            }
        };
        match matches.len() {
            1 => Decision::Attach {
                node: matches[0],
                outcome: ResolveOutcome::ExactUnique,
                corrected: None,
            },
            0 => self.decide_zero_matches(doc, &clean, anchor_text, in_grace),
            _ => self.disambiguate(doc, &clean, &matches, anchor_text),
        }
    }

    fn disambiguate<D: DocumentQuery>(
        &mut self,
        doc: &D,
        selector: &str,
        matches: &[NodeId],
        anchor_text: &str,
    ) -> Decision {
        if !anchor_text.is_empty() {
            let exact = matches
                .iter()
                .find(|node| self.snapshot_text(doc, **node) == anchor_text);
            if let Some(node) = exact {
                return Decision::Attach {
                    node: *node,
                    outcome: ResolveOutcome::DisambiguatedByText,
                    corrected: None,
                };
            }
        }
        let remembered = (!anchor_text.is_empty()).then_some(anchor_text);
        if let Some(node) = self.resolver.best_among(doc, matches, selector, remembered) {
            return Decision::Attach {
                node,
                outcome: ResolveOutcome::DisambiguatedByScore,
                corrected: None,
            };
        }
        // Nothing separates the candidates; take the first and retry on the
        // next batch.
        Decision::Attach {
            node: matches[0],
            outcome: ResolveOutcome::AmbiguousFirst,
            corrected: None,
        }
    }

    fn decide_zero_matches<D: DocumentQuery>(
        &mut self,
        doc: &D,
        selector: &str,
        anchor_text: &str,
        in_grace: bool,
    ) -> Decision {
        if in_grace {
            log::debug!("anchor for {selector:?} vanished inside the creation grace window");
            return Decision::Park;
        }
        let remembered = (!anchor_text.is_empty()).then_some(anchor_text);
        match self.resolver.find_best_match(doc, selector, remembered) {
            Some(node) => {
                let corrected = self.generator.generate(doc, node).map(|fresh| Correction {
                    selector: fresh,
                    anchor_text: self.snapshot_text(doc, node),
                });
                Decision::Attach {
                    node,
                    outcome: ResolveOutcome::FuzzyRecovered,
                    corrected,
                }
            }
            None => Decision::Orphan,
        }
    }

    fn snapshot_text<D: DocumentQuery>(&self, doc: &D, node: NodeId) -> String {
        doc.text_content(node)
            .trim()
            .chars()
            .take(self.config.anchor_text_len)
            .collect()
    }
}

impl Default for AnchorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn needs_attention<D: DocumentQuery>(record: &AnchorRecord, doc: &D) -> bool {
    match record.state {
        AnchorState::Resolved => {
            record.needs_disambiguation
                || record.resolved.is_none_or(|node| !doc.is_attached(node))
        }
        AnchorState::Pending | AnchorState::Orphaned => true,
    }
}

fn push_update(sink: &mut dyn PersistenceSink, update: SelectorUpdate) {
    if let Err(err) = sink.persist(&update) {
        log::warn!("persistence sink failed for note {}: {err}", update.note_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemark_dom::{parse_html, Document, ElementInit};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default, Clone)]
    struct RecordingSink {
        updates: Rc<RefCell<Vec<SelectorUpdate>>>,
    }

    impl PersistenceSink for RecordingSink {
        fn persist(&mut self, update: &SelectorUpdate) -> anyhow::Result<()> {
            self.updates.borrow_mut().push(update.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl PersistenceSink for FailingSink {
        fn persist(&mut self, _update: &SelectorUpdate) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("storage offline"))
        }
    }

    #[test]
    fn created_note_resolves_and_persists_immediately() {
        let doc = parse_html(r#"<main><button id="save-note">Save</button></main>"#);
        let target = doc.query_selector_all("#save-note").unwrap()[0];
        let sink = RecordingSink::default();
        let mut engine = AnchorEngine::with_sink(EngineConfig::default(), Box::new(sink.clone()));

        let event = engine.insert_created(&doc, "n-1", target).unwrap();
        assert_eq!(event.outcome, ResolveOutcome::Generated);
        assert_eq!(event.current, Some(target));

        let record = engine.record("n-1").unwrap();
        assert_eq!(record.state(), AnchorState::Resolved);
        assert_eq!(record.selector(), "#save-note");
        assert_eq!(record.anchor_text(), "Save");

        let updates = sink.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].selector, "#save-note");
        assert_eq!(updates[0].anchor_text, "Save");
    }

    #[test]
    fn duplicate_creation_is_rejected() {
        let doc = parse_html(r#"<button id="save">Save</button>"#);
        let target = doc.query_selector_all("#save").unwrap()[0];
        let mut engine = AnchorEngine::default();
        engine.insert_created(&doc, "n-1", target).unwrap();
        assert_eq!(
            engine.insert_created(&doc, "n-1", target),
            Err(AnchorError::DuplicateNote("n-1".to_string()))
        );
    }

    #[test]
    fn loaded_note_resolves_exactly() {
        let doc = parse_html(r#"<main><button id="save-note">Save</button></main>"#);
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", "#save-note", "Save");
        assert_eq!(engine.record("n-1").unwrap().state(), AnchorState::Pending);

        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::ExactUnique);
        assert_eq!(event.previous, None);
        assert_eq!(engine.record("n-1").unwrap().state(), AnchorState::Resolved);
    }

    #[test]
    fn exact_text_wins_among_lookalikes() {
        let doc = parse_html(
            "<ul>\
               <li class=\"item\">Buy milk substitute</li>\
               <li class=\"item\">Buy eggs</li>\
               <li class=\"item\">Buy milk</li>\
             </ul>",
        );
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", ".item", "Buy milk");

        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::DisambiguatedByText);
        let items = doc.query_selector_all(".item").unwrap();
        assert_eq!(event.current, Some(items[2]));
    }

    #[test]
    fn scorer_separates_when_no_text_is_exact() {
        let doc = parse_html(
            "<div class=\"note\">Call the plumber today</div>\
             <div class=\"note\">Water the plants tomorrow</div>",
        );
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", ".note", "Water the plants");

        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::DisambiguatedByScore);
        let notes = doc.query_selector_all(".note").unwrap();
        assert_eq!(event.current, Some(notes[1]));
    }

    #[test]
    fn ambiguous_matches_take_the_first_and_stay_flagged() {
        let mut doc = parse_html(
            "<ul><li class=\"item\">alpha</li><li class=\"item\">beta</li></ul>",
        );
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", ".item", "milk run");

        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::AmbiguousFirst);
        let items = doc.query_selector_all(".item").unwrap();
        assert_eq!(event.current, Some(items[0]));
        assert!(engine.record("n-1").unwrap().needs_disambiguation());

        // Once some candidate's text matches the snapshot, the next batch
        // settles the record and clears the flag.
        doc.set_text(items[1], "milk run");
        let events = engine.on_dom_change_batch(&doc);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, ResolveOutcome::DisambiguatedByText);
        assert_eq!(events[0].current, Some(items[1]));
        assert!(!engine.record("n-1").unwrap().needs_disambiguation());
    }

    #[test]
    fn fuzzy_recovery_regenerates_and_persists_the_selector() {
        let doc = parse_html(
            r#"<main><section id="comp-57" class="panel">Quarterly report</section></main>"#,
        );
        let sink = RecordingSink::default();
        let mut engine = AnchorEngine::with_sink(EngineConfig::default(), Box::new(sink.clone()));
        engine.insert_loaded("n-1", "section#comp-42.panel", "Quarterly report");

        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::FuzzyRecovered);

        let record = engine.record("n-1").unwrap();
        assert_eq!(record.state(), AnchorState::Resolved);
        assert_eq!(record.selector(), "#comp-57");

        let updates = sink.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].selector, "#comp-57");
        assert_eq!(updates[0].anchor_text, "Quarterly report");
    }

    #[test]
    fn unrelated_document_orphans_the_note() {
        let doc = parse_html("<p>nothing to see</p>");
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", "button#save.primary", "Save");

        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::Orphaned);
        assert!(engine.record("n-1").unwrap().is_orphaned());
        assert_eq!(engine.orphan_count(), 1);
        let ids: Vec<&str> = engine.orphans().map(AnchorRecord::note_id).collect();
        assert_eq!(ids, vec!["n-1"]);
    }

    #[test]
    fn orphan_recovers_on_a_later_batch() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_element(root, ElementInit::new("p"));
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", "#save-note", "Save");
        engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(engine.orphan_count(), 1);

        let button = doc.append_element(root, ElementInit::new("button").id("save-note"));
        doc.append_text(button, "Save");
        let events = engine.on_dom_change_batch(&doc);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, ResolveOutcome::ExactUnique);
        assert_eq!(events[0].previous, None);
        assert_eq!(events[0].current, Some(button));
        assert_eq!(engine.orphan_count(), 0);
    }

    #[test]
    fn created_records_wait_out_the_grace_window() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_element(root, ElementInit::new("p"));
        let button = doc.append_element(root, ElementInit::new("button").id("save-note"));
        doc.append_text(button, "Save");

        let config = EngineConfig {
            creation_grace: Duration::from_secs(3600),
            ..Default::default()
        };
        let mut engine = AnchorEngine::new(config);
        engine.insert_created(&doc, "n-1", button).unwrap();

        doc.remove_node(button);
        let events = engine.on_dom_change_batch(&doc);
        assert_eq!(events[0].outcome, ResolveOutcome::GracePending);
        assert_eq!(engine.record("n-1").unwrap().state(), AnchorState::Pending);

        // The next render brings the element back; the parked record picks
        // it up without ever having fuzzy-matched against the torn-down DOM.
        let reborn = doc.append_element(root, ElementInit::new("button").id("save-note"));
        doc.append_text(reborn, "Save");
        let events = engine.on_dom_change_batch(&doc);
        assert_eq!(events[0].outcome, ResolveOutcome::ExactUnique);
        assert_eq!(events[0].current, Some(reborn));
    }

    #[test]
    fn zero_grace_goes_straight_to_fuzzy_matching() {
        let mut doc = Document::new();
        let root = doc.root();
        let filler = doc.append_element(root, ElementInit::new("p"));
        doc.append_text(filler, "Entirely unrelated copy");
        let button = doc.append_element(root, ElementInit::new("button").id("save-note"));
        doc.append_text(button, "Save");

        let config = EngineConfig {
            creation_grace: Duration::ZERO,
            ..Default::default()
        };
        let mut engine = AnchorEngine::new(config);
        engine.insert_created(&doc, "n-1", button).unwrap();

        doc.remove_node(button);
        let reborn =
            doc.append_element(root, ElementInit::new("button").class("primary").id("ember99"));
        doc.append_text(reborn, "Save");
        let events = engine.on_dom_change_batch(&doc);
        assert_eq!(events[0].outcome, ResolveOutcome::FuzzyRecovered);
        assert_eq!(events[0].current, Some(reborn));
        assert_eq!(engine.record("n-1").unwrap().selector(), ".primary");
    }

    #[test]
    fn reanchor_replaces_selector_text_and_state() {
        let doc =
            parse_html(r#"<main><p id="intro">Intro</p><button id="cta">Go</button></main>"#);
        let sink = RecordingSink::default();
        let mut engine = AnchorEngine::with_sink(EngineConfig::default(), Box::new(sink.clone()));
        engine.insert_loaded("n-1", "#intro", "Intro");
        engine.resolve(&doc, "n-1").unwrap();
        let old = doc.query_selector_all("#intro").unwrap()[0];
        let target = doc.query_selector_all("#cta").unwrap()[0];

        let event = engine.reanchor(&doc, "n-1", target).unwrap();
        assert_eq!(event.outcome, ResolveOutcome::Generated);
        assert_eq!(event.previous, Some(old));
        assert_eq!(event.current, Some(target));

        let record = engine.record("n-1").unwrap();
        assert_eq!(record.selector(), "#cta");
        assert_eq!(record.anchor_text(), "Go");
        assert_eq!(record.state(), AnchorState::Resolved);
        assert_eq!(sink.updates.borrow().last().unwrap().selector, "#cta");
    }

    #[test]
    fn unknown_notes_error() {
        let doc = parse_html("<p>x</p>");
        let node = doc.all_elements()[0];
        let mut engine = AnchorEngine::default();
        assert_eq!(
            engine.resolve(&doc, "ghost"),
            Err(AnchorError::UnknownNote("ghost".to_string()))
        );
        assert_eq!(
            engine.reanchor(&doc, "ghost", node),
            Err(AnchorError::UnknownNote("ghost".to_string()))
        );
    }

    #[test]
    fn invalid_stored_selector_is_never_queried() {
        let doc = parse_html("<p>x</p>");
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", "javascript:alert(1)", "x");
        let event = engine.resolve(&doc, "n-1").unwrap();
        assert_eq!(event.outcome, ResolveOutcome::Orphaned);
    }

    #[test]
    fn failing_sink_does_not_affect_resolution() {
        let doc = parse_html(r#"<button id="save">Save</button>"#);
        let target = doc.query_selector_all("#save").unwrap()[0];
        let mut engine = AnchorEngine::with_sink(EngineConfig::default(), Box::new(FailingSink));
        let event = engine.insert_created(&doc, "n-1", target).unwrap();
        assert_eq!(event.current, Some(target));
        assert_eq!(engine.record("n-1").unwrap().state(), AnchorState::Resolved);
    }

    #[test]
    fn settled_records_are_skipped_by_batches() {
        let doc = parse_html(r#"<button id="save">Save</button>"#);
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", "#save", "Save");
        engine.resolve(&doc, "n-1").unwrap();
        assert!(engine.on_dom_change_batch(&doc).is_empty());
    }

    #[test]
    fn remove_destroys_the_record() {
        let mut engine = AnchorEngine::default();
        engine.insert_loaded("n-1", "#save", "Save");
        let record = engine.remove("n-1").unwrap();
        assert_eq!(record.note_id(), "n-1");
        assert!(engine.record("n-1").is_none());
        assert!(engine.remove("n-1").is_none());
        assert!(engine.is_empty());
    }

    #[test]
    fn insert_loaded_upserts_external_updates() {
        let doc = parse_html(r#"<button id="save">Save</button>"#);
        let target = doc.query_selector_all("#save").unwrap()[0];
        let mut engine = AnchorEngine::default();
        engine.insert_created(&doc, "n-1", target).unwrap();

        engine.insert_loaded("n-1", "#fresh", "Fresh");
        let record = engine.record("n-1").unwrap();
        assert_eq!(record.state(), AnchorState::Pending);
        assert_eq!(record.selector(), "#fresh");
        assert!(!record.created_in_session);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn snapshot_text_is_trimmed_and_capped() {
        let long = "x".repeat(300);
        let html = format!("<p id=\"long\">  {long}  </p>");
        let doc = parse_html(&html);
        let target = doc.query_selector_all("#long").unwrap()[0];
        let mut engine = AnchorEngine::default();
        engine.insert_created(&doc, "n-1", target).unwrap();
        let record = engine.record("n-1").unwrap();
        assert_eq!(record.anchor_text().chars().count(), 100);
        assert!(!record.anchor_text().starts_with(' '));
    }

    proptest! {
        #[test]
        fn proptest_resolution_never_panics(selector in "\\PC{0,60}") {
            let doc = parse_html(
                "<main><p id=\"a\">alpha</p><span class=\"b\">beta</span></main>",
            );
            let mut engine = AnchorEngine::default();
            engine.insert_loaded("n-1", &selector, "alpha");
            let event = engine.resolve(&doc, "n-1");
            prop_assert!(event.is_ok());
            let state = engine.record("n-1").map(AnchorRecord::state);
            prop_assert!(
                state == Some(AnchorState::Resolved) || state == Some(AnchorState::Orphaned)
            );
        }
    }
}
