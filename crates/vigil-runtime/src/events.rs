//! Execution events and notifiers for observability.
//!
//! Events are emitted while a run progresses so callers can stream progress
//! or assert on ordering.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use vigil_step::SkipReason;

use crate::RunStatus;

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  RunStarted { run_id: String, workflow: String },

  /// A step has been dispatched.
  StepStarted { run_id: String, step: String },

  /// An attempt failed and another will follow after `delay_ms`.
  StepRetrying {
    run_id: String,
    step: String,
    attempt: u32,
    delay_ms: u64,
    error: String,
  },

  StepSucceeded {
    run_id: String,
    step: String,
    attempts: u32,
  },

  /// A step failed terminally.
  StepFailed {
    run_id: String,
    step: String,
    error: String,
  },

  StepSkipped {
    run_id: String,
    step: String,
    reason: SkipReason,
  },

  RunFinished { run_id: String, status: RunStatus },
}

/// Trait for receiving execution events.
///
/// The scheduler calls `notify` for each event; implementations decide what
/// to do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
