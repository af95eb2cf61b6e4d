//! Serializable payloads the CLI prints on stdout.

use pagemark_anchor::{AnchorState, ResolveOutcome, SelectorUpdate};
use pagemark_dom::{Document, DocumentQuery, NodeId};
use serde::Serialize;

/// Characters of element text included in reports.
const TEXT_PREVIEW_LEN: usize = 80;

/// Enough about a matched element for a human or a script to confirm the
/// right one was found.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    /// Arena handle, stable within this document load.
    pub node: NodeId,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    pub text: String,
}

impl NodeReport {
    pub fn build(doc: &Document, node: NodeId) -> Self {
        let text = doc
            .text_content(node)
            .trim()
            .chars()
            .take(TEXT_PREVIEW_LEN)
            .collect();
        Self {
            node,
            tag: doc.tag_name(node).unwrap_or_default().to_string(),
            id: doc.element_id(node).map(str::to_string),
            classes: doc.classes(node).into_iter().map(str::to_string).collect(),
            text,
        }
    }

    /// One-line rendering for the human-readable modes.
    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        if let Some(id) = &self.id {
            out.push('#');
            out.push_str(id);
        }
        for class in &self.classes {
            out.push('.');
            out.push_str(class);
        }
        if !self.text.is_empty() {
            out.push(' ');
            out.push_str(&format!("{:?}", self.text));
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateReport {
    pub selector: String,
    pub confidence: u8,
    pub target: NodeReport,
}

#[derive(Debug, Serialize)]
pub struct ConfidenceReport {
    pub selector: String,
    pub confidence: u8,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub matched: bool,
    pub outcome: ResolveOutcome,
    pub state: AnchorState,
    /// The record's selector after resolution; differs from the input when
    /// fuzzy recovery regenerated it.
    pub selector: String,
    /// True when the match is a provisional first-of-several pick that later
    /// mutation batches would keep retrying.
    pub needs_disambiguation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeReport>,
}

#[derive(Debug, Serialize)]
pub struct NoteReport {
    pub note_id: String,
    pub outcome: ResolveOutcome,
    pub state: AnchorState,
    pub selector: String,
    pub needs_disambiguation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeReport>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub total: usize,
    pub resolved: usize,
    pub orphaned: usize,
    pub notes: Vec<NoteReport>,
    /// Selector corrections the engine pushed to persistence along the way.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<SelectorUpdate>,
}
