//! The graph-surface capability.
//!
//! Rendering is an external collaborator: the session drives whatever draws
//! the map through this interface and consumes its gesture events, without
//! depending on any particular rendering technology.

use dxmap_core::{GraphStore, NodeId};

/// A user gesture reported by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The pointer entered a node.
    Hover(NodeId),
    /// The pointer left the hovered node.
    Blur,
    /// A node was clicked.
    Click(NodeId),
}

/// Contextual info panel content, keyed by node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverCard {
    Symptom {
        id: NodeId,
        symptoms: Vec<String>,
    },
    Diagnosis {
        id: NodeId,
        label: String,
        confidence: Option<f64>,
    },
    Test {
        id: NodeId,
        name: String,
        description: String,
        cost: Option<f64>,
    },
    Pending {
        id: NodeId,
        /// How many completed tests have buffered a note so far.
        noted_tests: usize,
    },
}

/// What the session requires of a rendering surface.
pub trait GraphSurface {
    /// Redraws the map from the current store. Called whenever the store's
    /// revision moved within a logical turn.
    fn render(&mut self, store: &GraphStore);

    /// Shows the contextual info panel for a hovered node.
    fn show_hover_card(&mut self, card: HoverCard);

    /// Hides the info panel.
    fn hide_hover_card(&mut self);
}
