//! Directed edges of the decision map.
//!
//! Edge ids are derived deterministically from their endpoints
//! (`"{from}->{to}"`), which makes duplicate insertion idempotent by
//! construction: re-adding the same logical edge produces the same id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// Stable edge identifier derived from the endpoint node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Derives the id for an edge from `from` to `to`.
    pub fn between(from: &NodeId, to: &NodeId) -> Self {
        EdgeId(format!("{}->{}", from, to))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directed edge. Carries no lifecycle beyond existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Derived id (see [`EdgeId::between`]).
    pub id: EdgeId,
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
}

impl Edge {
    /// Creates the edge from `from` to `to` with its derived id.
    pub fn between(from: NodeId, to: NodeId) -> Self {
        let id = EdgeId::between(&from, &to);
        Edge { id, from, to }
    }
}
