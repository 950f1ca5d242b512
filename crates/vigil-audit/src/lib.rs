//! Vigil Audit
//!
//! Pure detection and reporting logic over audit data:
//!
//! - [`Dataset`]: a snapshot of users, roles, groups, grants and audit events
//!   taken at a single instant (`as_of`), with time-windowed views.
//! - [`Evaluator`]s: independent heuristics that scan a dataset and emit
//!   [`Finding`]s with a stable [`FindingCode`].
//! - [`FindingReport`]: findings from many evaluators merged into one report
//!   grouped by code, in code declaration order.
//! - [`stats`]: activity and user summaries used by the reporting steps.
//!
//! Nothing here performs I/O. Given the same dataset, every function returns
//! the same result.

mod dataset;
mod evaluators;
mod finding;
mod report;
pub mod stats;

pub use dataset::{
  AuditEvent, Dataset, EventWindow, GroupMembership, GroupRecord, LastActivity, PermissionGrant,
  RoleAssignment, RoleRecord, UserRecord,
};
pub use evaluators::{
  DuplicateGrants, EmptyGroups, EmptyPermissionRoles, Evaluator, FailedLogins, HighActivitySources,
  Inactivity, OffHoursAdminActions, OrphanRoleAssignments, activity_evaluators, evaluate_all,
  permission_evaluators, standard_evaluators,
};
pub use finding::{Finding, FindingCode, Severity, Subject};
pub use report::{FindingReport, FindingSection};
