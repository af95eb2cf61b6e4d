//! Document model and query layer for the anchoring engine.
//!
//! Provides three things the rest of the workspace builds on:
//!
//! - [`Document`]: an arena-backed element tree with stable [`NodeId`]
//!   handles that survive detachment (tombstoning instead of reuse), plus a
//!   revision counter for change batching.
//! - [`DocumentQuery`]: the read-side trait hosts implement. Everything
//!   above this crate is generic over it, so the engine runs the same
//!   against the in-tree arena and against an embedder's real DOM bridge.
//! - A selector engine for the pragmatic CSS subset the generator emits,
//!   surfacing malformed syntax as [`QueryError::Syntax`].
//!
//! [`parse_html`] loads real markup into a [`Document`] and deliberately
//! never fails; broken pages are the normal case for this system.

mod document;
mod error;
mod html;
mod node;
mod provider;
mod query;

pub use document::Document;
pub use error::{QueryError, Result};
pub use html::parse_html;
pub use node::{ElementInit, NodeId};
pub use provider::DocumentQuery;
pub use query::check_selector_syntax;
