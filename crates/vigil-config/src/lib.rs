//! Vigil Config
//!
//! This crate contains the serializable workflow configuration types for vigil.
//! These types describe maintenance workflows before they are resolved into an
//! executable, frozen graph.
//!
//! Configuration is loaded from JSON files (see `workflows/` at the repository
//! root). The resolver takes these definitions, binds every step kind to a
//! built-in task, and validates the dependency graph.

mod enums;
mod policy;
mod step;
mod workflow;

pub use enums::RetryBackoff;
pub use policy::{AuditPolicy, BusinessHours};
pub use step::{StepDef, StepKind};
pub use workflow::WorkflowDef;
