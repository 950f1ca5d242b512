//! Vigil Workflow
//!
//! The validated, immutable representation of a workflow:
//!
//! - [`Step`]: a named unit of work with its predecessors, criticality and
//!   optional retry override.
//! - [`Graph`]: the dependency relation, checked for duplicates, unknown
//!   references and cycles when it is built.
//! - [`Workflow`]: steps plus their frozen graph, ready to be scheduled.

mod error;
mod graph;
mod retry;
mod step;
mod workflow;

pub use error::GraphError;
pub use graph::Graph;
pub use retry::RetryPolicy;
pub use step::Step;
pub use workflow::Workflow;
