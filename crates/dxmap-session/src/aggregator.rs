//! The per-symptom aggregation state machine.
//!
//! Completed-test notes are buffered on a pending node before the next
//! oracle query. Per symptom the states are: no aggregator, aggregator open
//! (notes buffering), aggregator converted. Conversion reuses the pending
//! node's id -- the payload flips to a symptom payload in place, so the
//! test edges feeding it stay valid without rewriting.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use dxmap_core::layout::{self, Bias};
use dxmap_core::{
    Edge, GraphStore, IdAllocator, Node, NodeId, NodeKind, NodePayload, PendingPayload,
    SymptomPayload,
};

use crate::error::SessionError;

/// Aggregation state for one symptom node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatorState {
    /// No test child of this symptom has completed yet.
    NoAggregator,
    /// An aggregation point is buffering notes.
    Open(NodeId),
}

/// Bookkeeping for open and converted aggregation points.
///
/// `open` maps a symptom id to its single live aggregator; `converted` holds
/// aggregator ids whose conversion already ran -- terminal, so a second
/// activation of the same id is a no-op.
#[derive(Debug, Clone, Default)]
pub struct AggregatorLedger {
    open: IndexMap<NodeId, NodeId>,
    converted: IndexSet<NodeId>,
}

impl AggregatorLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregation state for a symptom node.
    pub fn state_of(&self, symptom: &NodeId) -> AggregatorState {
        match self.open.get(symptom) {
            Some(agg) => AggregatorState::Open(agg.clone()),
            None => AggregatorState::NoAggregator,
        }
    }

    /// Returns `true` once `id` has been converted to a symptom node.
    pub fn is_converted(&self, id: &NodeId) -> bool {
        self.converted.contains(id)
    }

    /// Buffers a completed test's note, creating the symptom's aggregation
    /// point on the first completion and reusing it afterwards.
    ///
    /// Returns the aggregator id, or `None` when the event is dropped: an
    /// unknown or non-test id, or a test with no discoverable parent symptom.
    /// Dropped events leave the store untouched (the dialog just closes).
    pub fn record_completion(
        &mut self,
        store: &mut GraphStore,
        alloc: &mut IdAllocator,
        test_id: &NodeId,
        note: &str,
    ) -> Result<Option<NodeId>, SessionError> {
        let Some(test_node) = store.node(test_id) else {
            warn!(test = %test_id, "test completion for unknown node; dropped");
            return Ok(None);
        };
        if test_node.kind() != NodeKind::Test {
            warn!(node = %test_id, "test completion on a non-test node; dropped");
            return Ok(None);
        }
        let Some(symptom_id) = store
            .parents_of(test_id)
            .into_iter()
            .find(|n| n.kind() == NodeKind::Symptom)
            .map(|n| n.id.clone())
        else {
            warn!(test = %test_id, "test has no parent symptom; note dropped");
            return Ok(None);
        };

        let agg_id = match self.open.get(&symptom_id) {
            Some(existing) => existing.clone(),
            None => {
                // First completion for this symptom: place the aggregation
                // point below-left of its test children, then correct with a
                // right bias.
                let test_positions: Vec<_> = store
                    .children_of(&symptom_id)
                    .into_iter()
                    .filter(|n| n.kind() == NodeKind::Test)
                    .map(|n| n.pos)
                    .collect();
                let anchor = layout::aggregator_anchor(&test_positions);
                let pos = layout::find_safe_position(store, anchor, Bias::Right);

                let id = alloc.next(NodeKind::Pending);
                store.add_nodes(vec![Node::new(
                    id.clone(),
                    pos,
                    NodePayload::Pending(PendingPayload::for_symptom(symptom_id.clone())),
                )])?;
                debug!(symptom = %symptom_id, aggregator = %id, "opened aggregation point");
                self.open.insert(symptom_id.clone(), id.clone());
                id
            }
        };

        // Add/overwrite the note keyed by the contributing test.
        let mut pending = store
            .node(&agg_id)
            .and_then(|n| n.payload.as_pending())
            .cloned()
            .ok_or_else(|| SessionError::UnknownNode { id: agg_id.clone() })?;
        pending.notes.insert(test_id.clone(), note.to_string());
        store.update_payload(&agg_id, NodePayload::Pending(pending))?;

        // Edge test -> aggregator; insertion is idempotent by derived id.
        let edge = Edge::between(test_id.clone(), agg_id.clone());
        if !store.contains_edge(&edge.id) {
            store.add_edges(vec![edge])?;
        }

        Ok(Some(agg_id))
    }

    /// Converts an open aggregation point in place into a symptom node.
    ///
    /// The new symptom set is the union of every symptom string currently in
    /// the graph with every non-blank buffered note. Returns that merged set,
    /// or `None` when the id is already converted, unknown, or not pending.
    /// The bookkeeping entry is discarded; the state is terminal for this id.
    pub fn activate(
        &mut self,
        store: &mut GraphStore,
        agg_id: &NodeId,
    ) -> Result<Option<Vec<String>>, SessionError> {
        if self.converted.contains(agg_id) {
            debug!(aggregator = %agg_id, "already converted; activation ignored");
            return Ok(None);
        }
        let Some(pending) = store
            .node(agg_id)
            .and_then(|n| n.payload.as_pending())
            .cloned()
        else {
            warn!(node = %agg_id, "activation of a non-pending node; ignored");
            return Ok(None);
        };

        let mut merged: IndexSet<String> = symptom_union(store).into_iter().collect();
        for note in pending.notes.values() {
            let trimmed = note.trim();
            if !trimmed.is_empty() {
                merged.insert(trimmed.to_string());
            }
        }
        let merged: Vec<String> = merged.into_iter().collect();

        store.update_payload(
            agg_id,
            NodePayload::Symptom(SymptomPayload {
                symptoms: merged.clone(),
            }),
        )?;
        self.open.shift_remove(&pending.symptom);
        self.converted.insert(agg_id.clone());
        info!(
            aggregator = %agg_id,
            symptoms = merged.len(),
            notes = pending.notes.len(),
            "aggregation point converted"
        );
        Ok(Some(merged))
    }
}

/// The union of every symptom node's symptom strings currently in the graph,
/// duplicate-free, in node-then-string insertion order. This -- not just the
/// path to one aggregation point -- is what the oracle sees.
pub fn symptom_union(store: &GraphStore) -> Vec<String> {
    let mut union = IndexSet::new();
    for node in store.nodes() {
        if let Some(symptom) = node.payload.as_symptom() {
            for s in &symptom.symptoms {
                union.insert(s.clone());
            }
        }
    }
    union.into_iter().collect()
}
