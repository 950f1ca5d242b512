//! Vigil Runtime
//!
//! [`Scheduler`] executes a frozen [`Workflow`](vigil_workflow::Workflow):
//! every step whose predecessors have all reached a terminal state is
//! dispatched concurrently, failed steps are retried according to their
//! policy, and descendants of a failed critical step are skipped without
//! being invoked. A run always ends with a [`RunReport`]; step failures never
//! escape the scheduler.

mod config;
mod events;
mod executor;
mod report;
mod scheduler;

pub use config::SchedulerConfig;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use report::{RunReport, RunState, RunStatus};
pub use scheduler::Scheduler;
