//! The canonical node/edge store for one decision-map session.
//!
//! [`GraphStore`] owns a petgraph `StableGraph` plus id lookup tables, and
//! exposes purely structural mutations -- no clinical rules live here. Every
//! mutation bumps a revision counter which serves as the commit/redraw signal
//! for whatever surface renders the map; mutations are visible to subsequent
//! queries immediately (same data structure, no staging).
//!
//! Batch semantics: `add_nodes` / `add_edges` validate the whole batch before
//! touching the graph, so a failed call leaves the store unchanged.

use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::{Edge, EdgeId};
use crate::error::CoreError;
use crate::id::NodeId;
use crate::layout::Point;
use crate::node::{Node, NodePayload};

/// The decision-map graph container.
///
/// Nodes are never deleted during a session; the graph only grows, and a
/// pending node's conversion to a symptom node happens in place via
/// [`update_payload`](Self::update_payload) so downstream edges stay valid
/// without rewriting.
///
/// Serializes as a flat node/edge snapshot (see [`GraphSnapshot`]); the
/// petgraph indices are rebuilt on deserialization.
#[derive(Debug, Clone)]
pub struct GraphStore {
    /// The underlying directed graph. Edge weights are the full [`Edge`]
    /// records so derived ids survive serialization.
    graph: StableGraph<Node, Edge, Directed, u32>,
    /// Mapping from node id to its graph index.
    node_indices: IndexMap<NodeId, NodeIndex<u32>>,
    /// Mapping from derived edge id to its graph index.
    edge_indices: IndexMap<EdgeId, EdgeIndex<u32>>,
    /// Commit signal: bumped by every effective mutation.
    revision: u64,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Creates an empty store at revision 0.
    pub fn new() -> Self {
        GraphStore {
            graph: StableGraph::new(),
            node_indices: IndexMap::new(),
            edge_indices: IndexMap::new(),
            revision: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Inserts a batch of nodes.
    ///
    /// Errors on a duplicate id (within the store or within the batch) and
    /// leaves the store unchanged in that case.
    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<(), CoreError> {
        // Validate the whole batch first.
        let mut seen: Vec<&NodeId> = Vec::with_capacity(nodes.len());
        for node in &nodes {
            if self.node_indices.contains_key(&node.id) || seen.contains(&&node.id) {
                return Err(CoreError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
            seen.push(&node.id);
        }

        if nodes.is_empty() {
            return Ok(());
        }
        for node in nodes {
            let id = node.id.clone();
            let idx = self.graph.add_node(node);
            self.node_indices.insert(id, idx);
        }
        self.revision += 1;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Inserts a batch of edges, idempotently by id.
    ///
    /// An edge whose id is already present is a no-op. An edge referencing a
    /// node outside the store errors and leaves the store unchanged.
    pub fn add_edges(&mut self, edges: Vec<Edge>) -> Result<(), CoreError> {
        for edge in &edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.node_indices.contains_key(endpoint) {
                    return Err(CoreError::MissingEndpoint {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        let mut inserted = false;
        for edge in edges {
            if self.edge_indices.contains_key(&edge.id) {
                continue;
            }
            let from = self.node_indices[&edge.from];
            let to = self.node_indices[&edge.to];
            let id = edge.id.clone();
            let idx = self.graph.add_edge(from, to, edge);
            self.edge_indices.insert(id, idx);
            inserted = true;
        }
        if inserted {
            self.revision += 1;
        }

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Replaces a node's payload wholesale, returning the old payload.
    ///
    /// The node keeps its id, position, and every connected edge -- this is
    /// the in-place conversion primitive.
    pub fn update_payload(
        &mut self,
        id: &NodeId,
        payload: NodePayload,
    ) -> Result<NodePayload, CoreError> {
        let idx = self.index_of(id)?;
        let node = self
            .graph
            .node_weight_mut(idx)
            .ok_or_else(|| CoreError::NodeNotFound { id: id.clone() })?;
        let old = std::mem::replace(&mut node.payload, payload);
        self.revision += 1;
        Ok(old)
    }

    /// Moves a node to a new position.
    pub fn set_position(&mut self, id: &NodeId, pos: Point) -> Result<(), CoreError> {
        let idx = self.index_of(id)?;
        let node = self
            .graph
            .node_weight_mut(idx)
            .ok_or_else(|| CoreError::NodeNotFound { id: id.clone() })?;
        node.pos = pos;
        self.revision += 1;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Looks up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        let idx = *self.node_indices.get(id)?;
        self.graph.node_weight(idx)
    }

    /// Returns `true` if a node with this id exists.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_indices.contains_key(id)
    }

    /// Returns `true` if an edge with this id exists.
    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_indices.contains_key(id)
    }

    /// Returns a node's position, if the node exists.
    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.node(id).map(|n| n.pos)
    }

    /// Returns positions for the requested ids, skipping unknown ids.
    pub fn positions(&self, ids: &[NodeId]) -> Vec<(NodeId, Point)> {
        ids.iter()
            .filter_map(|id| self.position(id).map(|p| (id.clone(), p)))
            .collect()
    }

    /// Iterates all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_indices.values().map(|&idx| &self.graph[idx])
    }

    /// Iterates all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_indices.values().map(|&idx| &self.graph[idx])
    }

    /// Returns all nodes matching a predicate, in insertion order.
    pub fn nodes_where<'a, F>(&'a self, predicate: F) -> Vec<&'a Node>
    where
        F: Fn(&Node) -> bool + 'a,
    {
        self.nodes().filter(|n| predicate(n)).collect()
    }

    /// Returns the nodes with an edge pointing at `id`.
    pub fn parents_of(&self, id: &NodeId) -> Vec<&Node> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Returns the nodes `id` points at.
    pub fn children_of(&self, id: &NodeId) -> Vec<&Node> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &NodeId, dir: Direction) -> Vec<&Node> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, dir)
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Number of nodes in the store.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges in the store.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Commit signal: increases whenever the store changed. A renderer
    /// compares revisions to decide whether a redraw is due.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn index_of(&self, id: &NodeId) -> Result<NodeIndex<u32>, CoreError> {
        self.node_indices
            .get(id)
            .copied()
            .ok_or_else(|| CoreError::NodeNotFound { id: id.clone() })
    }

    // -----------------------------------------------------------------------
    // Debug consistency assertion
    // -----------------------------------------------------------------------

    /// Verifies that every id map entry resolves to a live graph weight and
    /// that node ids agree with their index entries.
    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        for (id, &idx) in &self.node_indices {
            let node = self
                .graph
                .node_weight(idx)
                .unwrap_or_else(|| panic!("node {} has a dangling index", id));
            assert_eq!(&node.id, id, "node index entry id mismatch");
        }
        for (id, &idx) in &self.edge_indices {
            let edge = self
                .graph
                .edge_weight(idx)
                .unwrap_or_else(|| panic!("edge {} has a dangling index", id));
            assert_eq!(&edge.id, id, "edge index entry id mismatch");
        }
    }
}

/// Wire form of a [`GraphStore`]: nodes and edges in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    revision: u64,
}

impl Serialize for GraphStore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let snapshot = GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
            revision: self.revision,
        };
        snapshot.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GraphStore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let snapshot = GraphSnapshot::deserialize(deserializer)?;
        let mut store = GraphStore::new();
        store
            .add_nodes(snapshot.nodes)
            .map_err(serde::de::Error::custom)?;
        store
            .add_edges(snapshot.edges)
            .map_err(serde::de::Error::custom)?;
        store.revision = snapshot.revision;
        Ok(store)
    }
}
