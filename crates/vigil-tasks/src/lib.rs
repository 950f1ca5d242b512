//! Vigil Tasks
//!
//! Built-in step implementations for database maintenance and audit
//! workflows. Each task is a thin wrapper: it reads data through a
//! [`QueryExecutor`](vigil_host::QueryExecutor) or runs a command through a
//! [`ProcessRunner`](vigil_host::ProcessRunner), then hands the data to the
//! pure logic in `vigil-audit`.

mod audit;
mod backup;
mod database;
mod loader;
pub mod queries;
mod report;
mod users;

pub use audit::{AuditReportTask, SuspiciousActivityTask, UserActivityTask};
pub use backup::{CommandTask, DiskUsageTask, MongoBackupTask, PostgresBackupTask, PruneBackupsTask};
pub use database::{CleanupAuditLogsTask, DatabaseHealthTask, TableStatisticsTask};
pub use loader::DatasetLoader;
pub use report::FindingsReportTask;
pub use users::{
  DuplicatePermissionsTask, InactiveUsersTask, PasswordExpiryTask, PermissionAuditTask,
  UserReportTask,
};
