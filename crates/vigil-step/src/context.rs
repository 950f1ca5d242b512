use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use vigil_host::Clock;

use crate::{StepError, StepResult};

/// What a unit of work sees while it runs.
#[derive(Clone)]
pub struct StepContext {
  pub run_id: String,
  pub step: String,
  /// 1-based attempt number.
  pub attempt: u32,
  /// Results of the step's ancestors only.
  pub upstream: Arc<HashMap<String, StepResult>>,
  pub clock: Arc<dyn Clock>,
}

impl StepContext {
  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  /// Result of an ancestor step.
  pub fn upstream(&self, step: &str) -> Result<&StepResult, StepError> {
    self.upstream.get(step).ok_or_else(|| StepError::MissingUpstream {
      step: step.to_string(),
    })
  }

  /// Ancestor results in step name order.
  pub fn upstream_results(&self) -> Vec<&StepResult> {
    let mut results: Vec<&StepResult> = self.upstream.values().collect();
    results.sort_by(|a, b| a.step.cmp(&b.step));
    results
  }
}

impl fmt::Debug for StepContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StepContext")
      .field("run_id", &self.run_id)
      .field("step", &self.step)
      .field("attempt", &self.attempt)
      .field("upstream", &self.upstream.keys().collect::<Vec<_>>())
      .finish_non_exhaustive()
  }
}
