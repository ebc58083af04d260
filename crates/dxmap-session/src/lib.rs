//! Decision-map session logic: the aggregator protocol, branch expansion,
//! and the interaction controller, plus the two capability seams the core
//! depends on -- the recommendation oracle and the graph surface.

pub mod aggregator;
pub mod controller;
pub mod error;
pub mod expansion;
pub mod oracle;
pub mod surface;

// Re-export commonly used types
pub use aggregator::{symptom_union, AggregatorLedger, AggregatorState};
pub use controller::{ClickOutcome, LiteratureHandoff, Session, TestPrompt};
pub use error::SessionError;
pub use expansion::{expand, seed, Expansion};
pub use oracle::{Oracle, OracleError, OracleRequest, OracleResponse, TestAdvice};
pub use surface::{GraphSurface, HoverCard, SurfaceEvent};
