use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Payload pushed to the persistence collaborator whenever a selector is
/// freshly generated or fuzzy-corrected. Field names follow the persisted
/// wire shape consumed by the host extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorUpdate {
    pub note_id: String,
    pub selector: String,
    pub anchor_text: String,
}

/// Outbound persistence boundary.
///
/// Invoked synchronously but treated as fire-and-forget: the engine logs a
/// failure and moves on, and resolution outcomes never depend on the sink.
pub trait PersistenceSink {
    fn persist(&mut self, update: &SelectorUpdate) -> Result<()>;
}

/// Sink for hosts that persist through some other channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl PersistenceSink for DiscardSink {
    fn persist(&mut self, _update: &SelectorUpdate) -> Result<()> {
        Ok(())
    }
}
