use pagemark_dom::NodeId;
use serde::Serialize;
use std::time::Instant;

/// Lifecycle of one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorState {
    /// Resolution has not run yet, or a freshly created anchor is waiting
    /// out a re-render before fuzzy matching is allowed.
    Pending,
    /// The anchor element is currently identifiable.
    Resolved,
    /// No acceptable match; surfaced for manual action and retried on later
    /// mutation batches.
    Orphaned,
}

/// Bookkeeping for one note's anchor. Lives in the engine registry and is
/// mutated only by the engine's transition functions; `resolved` is a
/// non-owning handle that never keeps the node alive in the document.
#[derive(Debug, Clone)]
pub struct AnchorRecord {
    pub(crate) note_id: String,
    pub(crate) selector: String,
    pub(crate) anchor_text: String,
    pub(crate) resolved: Option<NodeId>,
    pub(crate) state: AnchorState,
    pub(crate) added_at: Instant,
    pub(crate) created_in_session: bool,
    pub(crate) needs_disambiguation: bool,
}

impl AnchorRecord {
    pub(crate) fn new(
        note_id: String,
        selector: String,
        anchor_text: String,
        created_in_session: bool,
    ) -> Self {
        Self {
            note_id,
            selector,
            anchor_text,
            resolved: None,
            state: AnchorState::Pending,
            added_at: Instant::now(),
            created_in_session,
            needs_disambiguation: false,
        }
    }

    #[must_use]
    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Trimmed text snapshot captured when the selector was generated or
    /// corrected. Empty when the anchor never carried text.
    #[must_use]
    pub fn anchor_text(&self) -> &str {
        &self.anchor_text
    }

    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.resolved
    }

    #[must_use]
    pub fn state(&self) -> AnchorState {
        self.state
    }

    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        self.state == AnchorState::Orphaned
    }

    /// True while the record sits on a multi-match first-candidate pick that
    /// neither exact text nor scoring could separate. Batch reconciliation
    /// keeps retrying these even when the pick is still attached.
    #[must_use]
    pub fn needs_disambiguation(&self) -> bool {
        self.needs_disambiguation
    }
}
