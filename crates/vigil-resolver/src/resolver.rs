use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vigil_config::{AuditPolicy, StepDef, StepKind, WorkflowDef};
use vigil_host::{CommandSpec, ProcessRunner, QueryExecutor};
use vigil_step::Task;
use vigil_tasks::{
  AuditReportTask, CleanupAuditLogsTask, CommandTask, DatabaseHealthTask, DiskUsageTask,
  DuplicatePermissionsTask, FindingsReportTask, InactiveUsersTask, MongoBackupTask,
  PasswordExpiryTask, PermissionAuditTask, PostgresBackupTask, PruneBackupsTask,
  SuspiciousActivityTask, TableStatisticsTask, UserActivityTask, UserReportTask, queries,
};
use vigil_workflow::{RetryPolicy, Step, Workflow};

use crate::error::ResolveError;

/// Resolver transforms a WorkflowDef into a frozen Workflow.
#[async_trait]
pub trait Resolver: Send + Sync {
  /// Resolve a workflow definition.
  ///
  /// This process:
  /// 1. Binds every step kind to a task
  /// 2. Merges workflow and step retry settings
  /// 3. Validates the graph structure (unique names, known dependencies, no cycles)
  async fn resolve(&self, def: WorkflowDef) -> Result<Workflow, ResolveError>;
}

/// Resolver binding steps to the built-in tasks of `vigil-tasks`.
pub struct StandardResolver {
  db: Arc<dyn QueryExecutor>,
  runner: Arc<dyn ProcessRunner>,
  backup_root: PathBuf,
}

impl StandardResolver {
  pub fn new(
    db: Arc<dyn QueryExecutor>,
    runner: Arc<dyn ProcessRunner>,
    backup_root: impl Into<PathBuf>,
  ) -> Self {
    Self {
      db,
      runner,
      backup_root: backup_root.into(),
    }
  }

  /// Relative directories live below the backup root.
  fn directory(&self, directory: &str) -> PathBuf {
    let path = Path::new(directory);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.backup_root.join(path)
    }
  }

  fn retry_policy(def: &WorkflowDef, step: &StepDef) -> RetryPolicy {
    let defaults = RetryPolicy::default();
    RetryPolicy {
      max_retries: step
        .max_retries
        .or(def.max_retries)
        .unwrap_or(defaults.max_retries),
      delay: step
        .retry_delay_ms
        .or(def.retry_delay_ms)
        .map(Duration::from_millis)
        .unwrap_or(defaults.delay),
      backoff: step
        .retry_backoff
        .or(def.retry_backoff)
        .unwrap_or(defaults.backoff),
      max_delay: None,
    }
  }

  /// Build the task for a single step definition.
  fn resolve_task(&self, step: &StepDef, policy: &AuditPolicy) -> Result<Arc<dyn Task>, ResolveError> {
    let db = self.db.clone();
    let runner = self.runner.clone();

    let task: Arc<dyn Task> = match &step.kind {
      StepKind::DatabaseHealth => Arc::new(DatabaseHealthTask::new(db)),
      StepKind::TableStatistics { tables } => {
        if let Some(bad) = tables.iter().find(|t| !queries::is_identifier(t)) {
          return Err(ResolveError::invalid_step(
            &step.step_id,
            format!("invalid table name '{}'", bad),
          ));
        }
        Arc::new(TableStatisticsTask::new(db, tables.clone()))
      }
      StepKind::PostgresBackup {
        container,
        database,
        user,
        directory,
      } => {
        require(&step.step_id, "container", container)?;
        require(&step.step_id, "database", database)?;
        Arc::new(PostgresBackupTask::new(
          runner,
          container,
          database,
          user,
          self.directory(directory),
        ))
      }
      StepKind::MongoBackup {
        container,
        database,
        directory,
      } => {
        require(&step.step_id, "container", container)?;
        require(&step.step_id, "database", database)?;
        Arc::new(MongoBackupTask::new(
          runner,
          container,
          database,
          self.directory(directory),
        ))
      }
      StepKind::PruneBackups {
        directory,
        pattern,
        retention_days,
      } => {
        require(&step.step_id, "pattern", pattern)?;
        Arc::new(PruneBackupsTask::new(
          runner,
          self.directory(directory),
          pattern,
          *retention_days,
        ))
      }
      StepKind::DiskUsage { directory } => {
        let path = directory
          .as_deref()
          .map(|d| self.directory(d))
          .unwrap_or_else(|| self.backup_root.clone());
        Arc::new(DiskUsageTask::new(runner, path))
      }
      StepKind::Command { program, args } => {
        require(&step.step_id, "program", program)?;
        let command = CommandSpec {
          program: program.clone(),
          args: args.clone(),
        };
        Arc::new(CommandTask::new(runner, command))
      }
      StepKind::UserActivity { limit } => Arc::new(UserActivityTask::new(db, policy, *limit)),
      StepKind::SuspiciousActivity => Arc::new(SuspiciousActivityTask::new(db, policy.clone())),
      StepKind::AuditReport { period_hours } => Arc::new(AuditReportTask::new(db, *period_hours)),
      StepKind::CleanupAuditLogs { retention_days } => {
        Arc::new(CleanupAuditLogsTask::new(db, *retention_days))
      }
      StepKind::InactiveUsers => Arc::new(InactiveUsersTask::new(db, policy)),
      StepKind::PermissionAudit => Arc::new(PermissionAuditTask::new(db)),
      StepKind::DuplicatePermissions => Arc::new(DuplicatePermissionsTask::new(db)),
      StepKind::PasswordExpiry => Arc::new(PasswordExpiryTask),
      StepKind::UserReport { new_user_days } => Arc::new(UserReportTask::new(db, *new_user_days)),
      StepKind::FindingsReport => Arc::new(FindingsReportTask),
    };
    Ok(task)
  }
}

#[async_trait]
impl Resolver for StandardResolver {
  async fn resolve(&self, def: WorkflowDef) -> Result<Workflow, ResolveError> {
    if def.steps.is_empty() {
      return Err(ResolveError::Empty {
        workflow: def.workflow_id.clone(),
      });
    }

    let mut steps = Vec::with_capacity(def.steps.len());
    for step_def in &def.steps {
      let task = self.resolve_task(step_def, &def.policy)?;
      let retry = Self::retry_policy(&def, step_def);
      debug!(
        workflow_id = %def.workflow_id,
        step = %step_def.step_id,
        max_retries = retry.max_retries,
        "step_resolved"
      );
      steps.push(
        Step::new(&step_def.step_id, task)
          .after(step_def.depends_on.iter().cloned())
          .critical(step_def.critical)
          .retry(retry),
      );
    }

    Ok(Workflow::new(def.workflow_id, steps)?)
  }
}

fn require(step: &str, field: &str, value: &str) -> Result<(), ResolveError> {
  if value.trim().is_empty() {
    return Err(ResolveError::invalid_step(step, format!("'{}' must not be empty", field)));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use vigil_config::RetryBackoff;
  use vigil_host::{StaticQueryExecutor, TokioProcessRunner};
  use vigil_workflow::GraphError;

  fn resolver() -> StandardResolver {
    StandardResolver::new(
      Arc::new(StaticQueryExecutor::new()),
      Arc::new(TokioProcessRunner),
      "/var/backups/vigil",
    )
  }

  fn parse(json: serde_json::Value) -> WorkflowDef {
    serde_json::from_value(json).unwrap()
  }

  #[tokio::test]
  async fn test_retry_settings_cascade() {
    let def = parse(serde_json::json!({
      "workflow_id": "wf",
      "name": "wf",
      "max_retries": 1,
      "retry_delay_ms": 1000,
      "steps": [
        { "step_id": "a", "type": "database_health" },
        { "step_id": "b", "type": "database_health", "depends_on": ["a"],
          "max_retries": 4, "retry_backoff": "exponential" }
      ]
    }));

    let workflow = resolver().resolve(def).await.unwrap();

    let a = workflow.step("a").unwrap().retry.unwrap();
    assert_eq!(a.max_retries, 1);
    assert_eq!(a.delay, Duration::from_secs(1));
    assert_eq!(a.backoff, RetryBackoff::Constant);

    let b = workflow.step("b").unwrap().retry.unwrap();
    assert_eq!(b.max_retries, 4);
    assert_eq!(b.delay, Duration::from_secs(1));
    assert_eq!(b.backoff, RetryBackoff::Exponential);
  }

  #[tokio::test]
  async fn test_defaults_without_retry_settings() {
    let def = parse(serde_json::json!({
      "workflow_id": "wf",
      "name": "wf",
      "steps": [ { "step_id": "a", "type": "password_expiry" } ]
    }));

    let workflow = resolver().resolve(def).await.unwrap();

    assert_eq!(workflow.step("a").unwrap().retry, Some(RetryPolicy::default()));
  }

  #[tokio::test]
  async fn test_unknown_dependency_is_a_graph_error() {
    let def = parse(serde_json::json!({
      "workflow_id": "wf",
      "name": "wf",
      "steps": [ { "step_id": "a", "type": "findings_report", "depends_on": ["missing"] } ]
    }));

    let err = resolver().resolve(def).await.unwrap_err();

    assert!(matches!(
      err,
      ResolveError::Graph(GraphError::UnknownDependency { .. })
    ));
  }

  #[tokio::test]
  async fn test_invalid_step_configuration() {
    let def = parse(serde_json::json!({
      "workflow_id": "wf",
      "name": "wf",
      "steps": [
        { "step_id": "stats", "type": "table_statistics", "tables": ["users", "x;--"] }
      ]
    }));

    let err = resolver().resolve(def).await.unwrap_err();
    assert_eq!(err.to_string(), "invalid step 'stats': invalid table name 'x;--'");

    let def = parse(serde_json::json!({
      "workflow_id": "wf",
      "name": "wf",
      "steps": [ { "step_id": "run", "type": "command", "program": " " } ]
    }));
    assert!(matches!(
      resolver().resolve(def).await,
      Err(ResolveError::InvalidStep { .. })
    ));
  }

  #[tokio::test]
  async fn test_empty_workflow() {
    let def = parse(serde_json::json!({ "workflow_id": "wf", "name": "wf", "steps": [] }));
    assert!(matches!(
      resolver().resolve(def).await,
      Err(ResolveError::Empty { .. })
    ));
  }

  #[test]
  fn test_relative_directories_resolve_below_backup_root() {
    let resolver = resolver();
    assert_eq!(
      resolver.directory("postgres"),
      PathBuf::from("/var/backups/vigil/postgres")
    );
    assert_eq!(resolver.directory("/srv/dumps"), PathBuf::from("/srv/dumps"));
  }
}
