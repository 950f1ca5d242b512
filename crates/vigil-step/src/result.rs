use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{StepExecutionError, StepPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Success,
  Failed,
  Skipped,
}

/// Why a step never ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  /// A critical ancestor failed.
  BlockedBy { step: String },
  /// The run was cancelled before the step was dispatched.
  Cancelled,
}

/// Terminal outcome of one step in a run.
///
/// `error` is present iff the status is `Failed`; `skip_reason` iff it is
/// `Skipped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
  pub step: String,
  pub status: StepStatus,
  pub payload: StepPayload,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<StepExecutionError>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<SkipReason>,
  /// Invocations of the unit of work, zero for skipped steps.
  pub attempts: u32,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl StepResult {
  pub fn success(
    step: impl Into<String>,
    payload: StepPayload,
    attempts: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
  ) -> Self {
    Self {
      step: step.into(),
      status: StepStatus::Success,
      payload,
      error: None,
      skip_reason: None,
      attempts,
      started_at,
      finished_at,
    }
  }

  pub fn failed(
    error: StepExecutionError,
    attempts: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
  ) -> Self {
    Self {
      step: error.step.clone(),
      status: StepStatus::Failed,
      payload: StepPayload::Empty,
      error: Some(error),
      skip_reason: None,
      attempts,
      started_at,
      finished_at,
    }
  }

  pub fn skipped(step: impl Into<String>, reason: SkipReason, at: DateTime<Utc>) -> Self {
    Self {
      step: step.into(),
      status: StepStatus::Skipped,
      payload: StepPayload::Empty,
      error: None,
      skip_reason: Some(reason),
      attempts: 0,
      started_at: at,
      finished_at: at,
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == StepStatus::Success
  }
}
