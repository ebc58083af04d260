//! Node identity for the decision map.
//!
//! Node ids are kind-prefixed strings (`"S-3"`, `"T-1"`) assigned by an
//! [`IdAllocator`] with one monotone counter per kind. Ids are never reused
//! within a session, including across a pending node's in-place conversion
//! to a symptom node (the id keeps its original `P` prefix).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four node variants of the decision map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Symptom set known at a point in the flow.
    Symptom,
    /// Candidate condition with optional confidence.
    Diagnosis,
    /// Recommended investigation with optional cost.
    Test,
    /// Aggregation point collecting completed-test notes for one symptom.
    Pending,
}

impl NodeKind {
    /// Single-letter id prefix and display label for this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            NodeKind::Symptom => "S",
            NodeKind::Diagnosis => "D",
            NodeKind::Test => "T",
            NodeKind::Pending => "P",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Stable node identifier, e.g. `"S-3"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Allocates kind-prefixed node ids with per-kind monotone counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    symptoms: u32,
    diagnoses: u32,
    tests: u32,
    pending: u32,
}

impl IdAllocator {
    /// Creates an allocator with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id for `kind`. Counters start at 1.
    pub fn next(&mut self, kind: NodeKind) -> NodeId {
        let counter = match kind {
            NodeKind::Symptom => &mut self.symptoms,
            NodeKind::Diagnosis => &mut self.diagnoses,
            NodeKind::Test => &mut self.tests,
            NodeKind::Pending => &mut self.pending,
        };
        *counter += 1;
        NodeId(format!("{}-{}", kind.prefix(), counter))
    }
}
