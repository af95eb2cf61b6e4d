//! Durable note anchoring: the registry and state machine that keep notes
//! attached to their elements across re-renders.
//!
//! Each note owns one [`AnchorRecord`]; the [`AnchorEngine`] is the only
//! thing that moves records between states:
//!
//! ```text
//! Pending  -> Resolved   exact match, disambiguation, or fuzzy recovery
//! Pending  -> Orphaned   nothing acceptable in the document
//! Resolved -> Pending    anchor vanished inside the creation grace window
//! Resolved -> Orphaned   anchor vanished and fuzzy recovery failed
//! Orphaned -> Resolved   a later mutation batch finds the element again
//! ```
//!
//! Orphaned records are surfaced, never dropped; removal on note deletion is
//! the only terminal transition. Selector corrections discovered along the
//! way go out through the [`PersistenceSink`], fire-and-forget.

mod config;
mod engine;
mod error;
mod persist;
mod record;

pub use config::{EngineConfig, DEFAULT_ANCHOR_TEXT_LEN, DEFAULT_CREATION_GRACE};
pub use engine::{AnchorEngine, AnchorEvent, ResolveOutcome};
pub use error::{AnchorError, Result};
pub use persist::{DiscardSink, PersistenceSink, SelectorUpdate};
pub use record::{AnchorRecord, AnchorState};
