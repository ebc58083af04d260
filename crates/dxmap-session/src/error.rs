//! Session error types.
//!
//! Most recoverable conditions in the protocol (missing parent lookup,
//! unknown ids from stale surface events, oracle failures) are handled
//! locally and only logged; the variants here cover the cases a caller can
//! actually act on.

use thiserror::Error;

use dxmap_core::{CoreError, NodeId};

/// Errors produced by the session crate.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A structural graph operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An operation referenced a node the store has never seen.
    #[error("unknown node: {id}")]
    UnknownNode { id: NodeId },

    /// The intake form handed over no usable symptom strings.
    #[error("intake produced no non-empty symptoms")]
    EmptyIntake,
}
