use serde::{Deserialize, Serialize};

use crate::enums::RetryBackoff;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub step_id: String,
  #[serde(flatten)]
  pub kind: StepKind,
  /// Names of the steps that must reach a terminal state first.
  #[serde(default)]
  pub depends_on: Vec<String>,
  /// A failed critical step blocks every step downstream of it.
  #[serde(default)]
  pub critical: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retries: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_delay_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_backoff: Option<RetryBackoff>,
}

/// The built-in unit of work a step runs.
///
/// Directory fields are resolved against the backup root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
  /// List the base tables of the public schema.
  DatabaseHealth,
  /// Row counts for a set of tables.
  TableStatistics {
    #[serde(default = "default_tables")]
    tables: Vec<String>,
  },
  /// `pg_dump` through a container, gzipped into the backup directory.
  PostgresBackup {
    container: String,
    database: String,
    #[serde(default = "default_postgres_user")]
    user: String,
    #[serde(default = "default_postgres_directory")]
    directory: String,
  },
  /// `mongodump` archive through a container.
  MongoBackup {
    container: String,
    database: String,
    #[serde(default = "default_mongo_directory")]
    directory: String,
  },
  /// Delete backup files older than the retention period.
  PruneBackups {
    directory: String,
    pattern: String,
    #[serde(default = "default_backup_retention_days")]
    retention_days: u32,
  },
  /// Report disk usage of the backup root (or a directory below it).
  DiskUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    directory: Option<String>,
  },
  /// Run an arbitrary program. A non-zero exit code fails the step.
  Command {
    program: String,
    #[serde(default)]
    args: Vec<String>,
  },
  /// Most active users inside the activity window.
  UserActivity {
    #[serde(default = "default_top_users")]
    limit: usize,
  },
  /// Failed logins, high-activity sources and off-hours admin actions.
  SuspiciousActivity,
  /// Event totals over a reporting period.
  AuditReport {
    #[serde(default = "default_report_period_hours")]
    period_hours: u32,
  },
  /// Delete audit log rows older than the retention period.
  CleanupAuditLogs {
    #[serde(default = "default_log_retention_days")]
    retention_days: u32,
  },
  InactiveUsers,
  /// Users without roles, roles without permissions and empty groups.
  PermissionAudit,
  /// Detect duplicated role grants. Detection only, nothing is removed.
  DuplicatePermissions,
  /// Placeholder until password expiry is tracked by the user store.
  PasswordExpiry,
  UserReport {
    #[serde(default = "default_new_user_days")]
    new_user_days: u32,
  },
  /// Aggregate every finding produced upstream into one report.
  FindingsReport,
}

fn default_tables() -> Vec<String> {
  ["users", "roles", "permissions", "sectors", "audit_logs"]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_postgres_user() -> String {
  "postgres".to_string()
}

fn default_postgres_directory() -> String {
  "postgres".to_string()
}

fn default_mongo_directory() -> String {
  "mongodb".to_string()
}

fn default_backup_retention_days() -> u32 {
  7
}

fn default_top_users() -> usize {
  10
}

fn default_report_period_hours() -> u32 {
  24
}

fn default_log_retention_days() -> u32 {
  90
}

fn default_new_user_days() -> u32 {
  30
}
