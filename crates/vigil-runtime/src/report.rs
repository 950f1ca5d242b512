use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_audit::FindingReport;
use vigil_step::{SkipReason, StepResult, StepStatus, aggregate};
use vigil_workflow::Workflow;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  /// Every step succeeded.
  Success,
  /// Every critical step succeeded but some other step failed or was skipped.
  PartialFailure,
  /// At least one critical step did not succeed.
  Failed,
}

impl RunStatus {
  pub(crate) fn evaluate(workflow: &Workflow, results: &BTreeMap<String, StepResult>) -> Self {
    let status_of = |name: &str| results.get(name).map(|r| r.status);

    let critical_failed = workflow
      .steps()
      .iter()
      .filter(|s| s.critical)
      .any(|s| status_of(&s.name) != Some(StepStatus::Success));
    if critical_failed {
      return RunStatus::Failed;
    }

    let all_succeeded = workflow
      .steps()
      .iter()
      .all(|s| status_of(&s.name) == Some(StepStatus::Success));
    if all_succeeded {
      RunStatus::Success
    } else {
      RunStatus::PartialFailure
    }
  }
}

/// Whether the run drained its graph or was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  Completed,
  Aborted,
}

/// Outcome of one workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id: String,
  pub workflow: String,
  pub status: RunStatus,
  pub state: RunState,
  /// One terminal result per step, keyed by step name.
  pub results: BTreeMap<String, StepResult>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl RunReport {
  pub fn result(&self, step: &str) -> Option<&StepResult> {
    self.results.get(step)
  }

  pub fn status_of(&self, step: &str) -> Option<StepStatus> {
    self.result(step).map(|r| r.status)
  }

  /// Names of steps with the given status, in name order.
  pub fn steps_with(&self, status: StepStatus) -> Vec<&str> {
    self
      .results
      .values()
      .filter(|r| r.status == status)
      .map(|r| r.step.as_str())
      .collect()
  }

  /// Steps that were skipped because a critical ancestor failed.
  pub fn blocked_steps(&self) -> Vec<&str> {
    self
      .results
      .values()
      .filter(|r| matches!(r.skip_reason, Some(SkipReason::BlockedBy { .. })))
      .map(|r| r.step.as_str())
      .collect()
  }

  /// All findings produced in the run, merged into one report.
  pub fn findings(&self) -> FindingReport {
    aggregate(self.results.values())
  }
}
