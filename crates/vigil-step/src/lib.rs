//! Vigil Step
//!
//! The contract between the scheduler and a unit of work:
//!
//! - [`Task`] is the unit of work. It receives a [`StepContext`] and returns a
//!   typed [`StepPayload`] or a [`StepError`].
//! - [`StepResult`] is the envelope the scheduler records for each step.
//! - [`aggregate`] merges the findings of many step results into one report.

mod aggregate;
mod context;
mod error;
mod payload;
mod result;
mod task;

pub use aggregate::aggregate;
pub use context::StepContext;
pub use error::{StepError, StepExecutionError};
pub use payload::StepPayload;
pub use result::{SkipReason, StepResult, StepStatus};
pub use task::{FnTask, Task, task_fn};
