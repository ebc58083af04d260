//! Core error types for dxmap-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the graph store. Layout never fails (placement falls
//! back to the last candidate), so it contributes no variants.

use thiserror::Error;

use crate::edge::EdgeId;
use crate::id::NodeId;

/// Core errors produced by the dxmap-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Attempting to insert a node whose id is already present.
    #[error("duplicate node id: {id}")]
    DuplicateNode { id: NodeId },

    /// A node id was not found in the store.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// An edge references a node that is not in the store (and not part of
    /// the same insertion batch).
    #[error("edge {edge} references missing node {node}")]
    MissingEndpoint { edge: EdgeId, node: NodeId },
}
