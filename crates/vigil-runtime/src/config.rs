use vigil_workflow::RetryPolicy;

/// Scheduler settings shared by every run.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
  /// Maximum steps running at once. `None` dispatches every ready step.
  pub max_concurrency: Option<usize>,
  /// Applied to steps without their own retry policy.
  pub default_retry: RetryPolicy,
}

impl SchedulerConfig {
  pub fn with_max_concurrency(mut self, limit: usize) -> Self {
    self.max_concurrency = Some(limit.max(1));
    self
  }

  pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
    self.default_retry = policy;
    self
  }
}
