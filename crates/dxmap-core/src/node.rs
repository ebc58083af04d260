//! Node payloads for the decision map.
//!
//! [`NodePayload`] is a tagged union over the four map variants -- each
//! carries only its relevant data, so a diagnosis node cannot accidentally
//! hold a note map and a pending node cannot hold a confidence.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{NodeId, NodeKind};
use crate::layout::Point;

/// A node of the decision map: identity, canvas position, and variant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable kind-prefixed id (never reused within a session).
    pub id: NodeId,
    /// Canvas position, mutable over the node's lifetime.
    pub pos: Point,
    /// Variant payload.
    pub payload: NodePayload,
}

impl Node {
    /// Creates a node from its parts.
    pub fn new(id: NodeId, pos: Point, payload: NodePayload) -> Self {
        Node { id, pos, payload }
    }

    /// Returns the node's variant kind.
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }
}

/// Variant payload of a decision-map node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodePayload {
    /// Symptom strings known at this point in the flow.
    Symptom(SymptomPayload),
    /// Candidate condition.
    Diagnosis(DiagnosisPayload),
    /// Recommended investigation.
    Test(TestPayload),
    /// Completed-test notes buffered ahead of the next expansion.
    Pending(PendingPayload),
}

/// Symptom node payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SymptomPayload {
    /// Distinct symptom strings in insertion order.
    pub symptoms: Vec<String>,
}

/// Diagnosis node payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisPayload {
    /// Condition label.
    pub label: String,
    /// Confidence in [0,1] when the oracle supplied one. Never fabricated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Test node payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestPayload {
    /// Test name.
    pub name: String,
    /// Description / clinician-facing notes.
    pub description: String,
    /// Relative cost weight when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// Pending-aggregator node payload.
///
/// Buffers one free-text note per contributing test until the node is
/// activated and converted in place into a symptom node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingPayload {
    /// The symptom node this aggregation point belongs to.
    pub symptom: NodeId,
    /// Note per contributing test node id. Keys unique, insertion ordered.
    pub notes: IndexMap<NodeId, String>,
}

impl PendingPayload {
    /// Creates an empty aggregation payload owned by `symptom`.
    pub fn for_symptom(symptom: NodeId) -> Self {
        PendingPayload {
            symptom,
            notes: IndexMap::new(),
        }
    }
}

impl NodePayload {
    /// Returns the variant kind.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Symptom(_) => NodeKind::Symptom,
            NodePayload::Diagnosis(_) => NodeKind::Diagnosis,
            NodePayload::Test(_) => NodeKind::Test,
            NodePayload::Pending(_) => NodeKind::Pending,
        }
    }

    /// Returns a human-oriented label for the node.
    pub fn label(&self) -> String {
        match self {
            NodePayload::Symptom(p) => p.symptoms.join(", "),
            NodePayload::Diagnosis(p) => p.label.clone(),
            NodePayload::Test(p) => p.name.clone(),
            NodePayload::Pending(p) => format!("{} result(s) pending", p.notes.len()),
        }
    }

    /// Returns the symptom payload, if this is a symptom node.
    pub fn as_symptom(&self) -> Option<&SymptomPayload> {
        match self {
            NodePayload::Symptom(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the diagnosis payload, if this is a diagnosis node.
    pub fn as_diagnosis(&self) -> Option<&DiagnosisPayload> {
        match self {
            NodePayload::Diagnosis(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the test payload, if this is a test node.
    pub fn as_test(&self) -> Option<&TestPayload> {
        match self {
            NodePayload::Test(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the pending payload, if this is an aggregation point.
    pub fn as_pending(&self) -> Option<&PendingPayload> {
        match self {
            NodePayload::Pending(p) => Some(p),
            _ => None,
        }
    }
}
