//! Branch expansion: materializing a new diagnosis/test cluster under a
//! parent symptom from an oracle response, or from the fallback when the
//! oracle had nothing to say.

use indexmap::IndexSet;
use tracing::debug;

use dxmap_core::layout::{fan_positions, find_safe_position, Side};
use dxmap_core::{
    DiagnosisPayload, Edge, GraphStore, IdAllocator, Node, NodeId, NodeKind, NodePayload,
    Point, SymptomPayload, TestPayload,
};

use crate::error::SessionError;
use crate::oracle::OracleResponse;

/// Placeholder diagnosis label when the oracle is unreachable.
pub const FALLBACK_DIAGNOSIS: &str = "Diagnosis pending";
/// Placeholder test when the oracle is unreachable.
pub const FALLBACK_TEST: &str = "Clinical review";
const FALLBACK_TEST_DESCRIPTION: &str = "Re-evaluate at the bedside; retry the recommendation";

/// Ids created by one expansion.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub diagnoses: Vec<NodeId>,
    pub tests: Vec<NodeId>,
}

/// Creates the session's root symptom node from the intake symptom list.
///
/// The intake strings are trimmed and deduplicated in order; an intake with
/// no usable strings is an error. The root anchors at the origin (corrected
/// only if the store somehow already has nodes there).
pub fn seed(
    store: &mut GraphStore,
    alloc: &mut IdAllocator,
    intake: Vec<String>,
) -> Result<NodeId, SessionError> {
    let mut symptoms = IndexSet::new();
    for s in intake {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            symptoms.insert(trimmed.to_string());
        }
    }
    if symptoms.is_empty() {
        return Err(SessionError::EmptyIntake);
    }

    let id = alloc.next(NodeKind::Symptom);
    let pos = find_safe_position(store, Point::default(), Side::Center);
    store.add_nodes(vec![Node::new(
        id.clone(),
        pos,
        NodePayload::Symptom(SymptomPayload {
            symptoms: symptoms.into_iter().collect(),
        }),
    )])?;
    debug!(root = %id, "seeded decision map");
    Ok(id)
}

/// Expands the map under `parent` from an oracle response, or from the
/// fallback when `response` is `None`.
///
/// Diagnoses fan out to the parent's left, tests to its right; every created
/// node is individually corrected by the layout engine, and each connects
/// from the parent by one edge. Nodes land before their edges, so the store
/// never holds an edge without its endpoints.
pub fn expand(
    store: &mut GraphStore,
    alloc: &mut IdAllocator,
    parent: &NodeId,
    response: Option<&OracleResponse>,
) -> Result<Expansion, SessionError> {
    let parent_pos = store
        .position(parent)
        .ok_or_else(|| SessionError::UnknownNode { id: parent.clone() })?;

    let (diagnoses, tests) = match response {
        Some(resp) => {
            let diagnoses = resp
                .diseases
                .iter()
                .map(|label| DiagnosisPayload {
                    label: label.clone(),
                    // The wire contract carries no confidence; none is invented.
                    confidence: None,
                })
                .collect::<Vec<_>>();
            let tests = resp
                .tests
                .iter()
                .map(|t| TestPayload {
                    name: t.test_name.clone(),
                    description: t.test_description.clone(),
                    cost: Some(t.cost_weight),
                })
                .collect::<Vec<_>>();
            (diagnoses, tests)
        }
        None => (
            vec![DiagnosisPayload {
                label: FALLBACK_DIAGNOSIS.to_string(),
                confidence: None,
            }],
            vec![TestPayload {
                name: FALLBACK_TEST.to_string(),
                description: FALLBACK_TEST_DESCRIPTION.to_string(),
                cost: None,
            }],
        ),
    };

    let mut created = Expansion::default();
    let mut edges = Vec::new();

    let diagnosis_bases = fan_positions(parent_pos, diagnoses.len(), Side::Left);
    for (payload, base) in diagnoses.into_iter().zip(diagnosis_bases) {
        let pos = find_safe_position(store, base, Side::Left);
        let id = alloc.next(NodeKind::Diagnosis);
        // Inserted one at a time so later siblings see earlier placements.
        store.add_nodes(vec![Node::new(id.clone(), pos, NodePayload::Diagnosis(payload))])?;
        edges.push(Edge::between(parent.clone(), id.clone()));
        created.diagnoses.push(id);
    }

    let test_bases = fan_positions(parent_pos, tests.len(), Side::Right);
    for (payload, base) in tests.into_iter().zip(test_bases) {
        let pos = find_safe_position(store, base, Side::Right);
        let id = alloc.next(NodeKind::Test);
        store.add_nodes(vec![Node::new(id.clone(), pos, NodePayload::Test(payload))])?;
        edges.push(Edge::between(parent.clone(), id.clone()));
        created.tests.push(id);
    }

    store.add_edges(edges)?;
    debug!(
        parent = %parent,
        diagnoses = created.diagnoses.len(),
        tests = created.tests.len(),
        fallback = response.is_none(),
        "expanded branch"
    );
    Ok(created)
}
