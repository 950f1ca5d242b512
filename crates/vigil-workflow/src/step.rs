use std::fmt;
use std::sync::Arc;

use vigil_step::Task;

use crate::RetryPolicy;

/// A named unit of work in a workflow.
#[derive(Clone)]
pub struct Step {
  pub name: String,
  pub task: Arc<dyn Task>,
  pub predecessors: Vec<String>,
  /// Overrides the scheduler's default retry policy.
  pub retry: Option<RetryPolicy>,
  /// A failed critical step blocks all of its descendants.
  pub critical: bool,
}

impl Step {
  pub fn new(name: impl Into<String>, task: Arc<dyn Task>) -> Self {
    Self {
      name: name.into(),
      task,
      predecessors: Vec::new(),
      retry: None,
      critical: false,
    }
  }

  pub fn after<I, S>(mut self, predecessors: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .predecessors
      .extend(predecessors.into_iter().map(Into::into));
    self
  }

  pub fn critical(mut self, critical: bool) -> Self {
    self.critical = critical;
    self
  }

  pub fn retry(mut self, policy: RetryPolicy) -> Self {
    self.retry = Some(policy);
    self
  }
}

impl fmt::Debug for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("predecessors", &self.predecessors)
      .field("retry", &self.retry)
      .field("critical", &self.critical)
      .finish_non_exhaustive()
  }
}
