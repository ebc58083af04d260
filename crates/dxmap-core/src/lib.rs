pub mod edge;
pub mod error;
pub mod id;
pub mod layout;
pub mod node;
pub mod store;

// Re-export commonly used types
pub use edge::{Edge, EdgeId};
pub use error::CoreError;
pub use id::{IdAllocator, NodeId, NodeKind};
pub use layout::{Bias, Point};
pub use node::{
    DiagnosisPayload, Node, NodePayload, PendingPayload, SymptomPayload, TestPayload,
};
pub use store::GraphStore;
