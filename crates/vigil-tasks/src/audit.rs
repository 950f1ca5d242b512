use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;
use vigil_audit::{Dataset, activity_evaluators, evaluate_all, stats};
use vigil_config::AuditPolicy;
use vigil_host::QueryExecutor;
use vigil_step::{StepContext, StepError, StepPayload, Task};

use crate::loader::DatasetLoader;

fn minutes(value: u64) -> TimeDelta {
  i64::try_from(value)
    .ok()
    .and_then(TimeDelta::try_minutes)
    .unwrap_or(TimeDelta::MAX)
}

fn since(as_of: DateTime<Utc>, span: TimeDelta) -> DateTime<Utc> {
  as_of
    .checked_sub_signed(span)
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Most active users over the activity window.
pub struct UserActivityTask {
  loader: DatasetLoader,
  window: TimeDelta,
  limit: usize,
}

impl UserActivityTask {
  pub fn new(db: Arc<dyn QueryExecutor>, policy: &AuditPolicy, limit: usize) -> Self {
    Self {
      loader: DatasetLoader::new(db),
      window: minutes(policy.activity_window_minutes),
      limit,
    }
  }
}

#[async_trait]
impl Task for UserActivityTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    dataset.events = self.loader.events_since(since(dataset.as_of, self.window)).await?;
    dataset.users = self.loader.users().await?;

    let summary = stats::user_activity(&dataset, self.window, self.limit);
    info!(step = %ctx.step, users = summary.users.len(), "user_activity_analyzed");
    Ok(StepPayload::Activity(summary))
  }
}

/// Failed logins, high-activity sources and off-hours admin actions.
pub struct SuspiciousActivityTask {
  loader: DatasetLoader,
  policy: AuditPolicy,
}

impl SuspiciousActivityTask {
  pub fn new(db: Arc<dyn QueryExecutor>, policy: AuditPolicy) -> Self {
    Self {
      loader: DatasetLoader::new(db),
      policy,
    }
  }

  /// The widest window any of the activity heuristics looks at.
  fn lookback(&self) -> TimeDelta {
    minutes(
      self
        .policy
        .failed_login_window_minutes
        .max(self.policy.activity_window_minutes),
    )
  }
}

#[async_trait]
impl Task for SuspiciousActivityTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    dataset.events = self
      .loader
      .events_since(since(dataset.as_of, self.lookback()))
      .await?;

    let findings = evaluate_all(&activity_evaluators(&self.policy), &dataset);
    info!(
      step = %ctx.step,
      events = dataset.events.len(),
      findings = findings.len(),
      "suspicious_activity_evaluated"
    );
    Ok(StepPayload::Findings(findings))
  }
}

/// Event totals over the reporting period.
pub struct AuditReportTask {
  loader: DatasetLoader,
  period_hours: u32,
}

impl AuditReportTask {
  pub fn new(db: Arc<dyn QueryExecutor>, period_hours: u32) -> Self {
    Self {
      loader: DatasetLoader::new(db),
      period_hours,
    }
  }
}

#[async_trait]
impl Task for AuditReportTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    let period = TimeDelta::hours(i64::from(self.period_hours));
    dataset.events = self.loader.events_since(since(dataset.as_of, period)).await?;

    let counts = stats::audit_counts(&dataset, self.period_hours);
    info!(
      step = %ctx.step,
      total_events = counts.total_events,
      active_users = counts.active_users,
      "audit_report_generated"
    );
    Ok(StepPayload::AuditCounts(counts))
  }
}
