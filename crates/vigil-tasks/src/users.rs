use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vigil_audit::{
  Dataset, DuplicateGrants, Evaluator, Inactivity, evaluate_all, permission_evaluators, stats,
};
use vigil_config::AuditPolicy;
use vigil_host::QueryExecutor;
use vigil_step::{StepContext, StepError, StepPayload, Task};

use crate::loader::DatasetLoader;

/// Active users idle for longer than the inactivity limit.
pub struct InactiveUsersTask {
  loader: DatasetLoader,
  evaluator: Inactivity,
}

impl InactiveUsersTask {
  pub fn new(db: Arc<dyn QueryExecutor>, policy: &AuditPolicy) -> Self {
    Self {
      loader: DatasetLoader::new(db),
      evaluator: Inactivity::from_policy(policy),
    }
  }
}

#[async_trait]
impl Task for InactiveUsersTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    dataset.users = self.loader.users().await?;
    dataset.last_activity = self.loader.last_activity().await?;

    let findings = self.evaluator.evaluate(&dataset);
    info!(step = %ctx.step, inactive = findings.len(), "inactive_users_identified");
    Ok(StepPayload::Findings(findings))
  }
}

/// Users without roles, roles without permissions and empty groups.
pub struct PermissionAuditTask {
  loader: DatasetLoader,
}

impl PermissionAuditTask {
  pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
    Self {
      loader: DatasetLoader::new(db),
    }
  }
}

#[async_trait]
impl Task for PermissionAuditTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    dataset.users = self.loader.users().await?;
    dataset.roles = self.loader.roles().await?;
    dataset.groups = self.loader.groups().await?;
    dataset.role_assignments = self.loader.role_assignments().await?;
    dataset.permission_grants = self.loader.permission_grants().await?;
    dataset.group_memberships = self.loader.group_memberships().await?;

    let findings = evaluate_all(&permission_evaluators(), &dataset);
    info!(step = %ctx.step, issues = findings.len(), "permissions_audited");
    Ok(StepPayload::Findings(findings))
  }
}

/// Reports duplicate role/permission grants. Never removes them.
pub struct DuplicatePermissionsTask {
  loader: DatasetLoader,
}

impl DuplicatePermissionsTask {
  pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
    Self {
      loader: DatasetLoader::new(db),
    }
  }
}

#[async_trait]
impl Task for DuplicatePermissionsTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    dataset.roles = self.loader.roles().await?;
    dataset.permission_grants = self.loader.permission_grants().await?;

    let findings = DuplicateGrants.evaluate(&dataset);
    info!(step = %ctx.step, duplicates = findings.len(), "duplicate_permissions_detected");
    Ok(StepPayload::Findings(findings))
  }
}

/// Placeholder: the user table has no password change timestamp to check.
#[derive(Debug, Default)]
pub struct PasswordExpiryTask;

#[async_trait]
impl Task for PasswordExpiryTask {
  async fn run(&self, _ctx: &StepContext) -> Result<StepPayload, StepError> {
    Ok(StepPayload::NotImplemented {
      reason: "users carry no password change timestamp".to_string(),
    })
  }
}

/// Account totals and role/group breakdowns.
pub struct UserReportTask {
  loader: DatasetLoader,
  new_user_days: u32,
}

impl UserReportTask {
  pub fn new(db: Arc<dyn QueryExecutor>, new_user_days: u32) -> Self {
    Self {
      loader: DatasetLoader::new(db),
      new_user_days,
    }
  }
}

#[async_trait]
impl Task for UserReportTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut dataset = Dataset::new(ctx.now());
    dataset.users = self.loader.users().await?;
    dataset.roles = self.loader.roles().await?;
    dataset.groups = self.loader.groups().await?;
    dataset.role_assignments = self.loader.role_assignments().await?;
    dataset.group_memberships = self.loader.group_memberships().await?;

    let report = stats::user_report(&dataset, self.new_user_days);
    info!(
      step = %ctx.step,
      active = report.total_active,
      inactive = report.total_inactive,
      "user_report_generated"
    );
    Ok(StepPayload::UserReport(report))
  }
}
