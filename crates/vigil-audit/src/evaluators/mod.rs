//! Anomaly heuristics.
//!
//! Each evaluator is a pure function of a [`Dataset`]: it reads the snapshot
//! (or a window of it ending at `as_of`) and returns findings in a stable
//! order, empty when nothing matches.

mod snapshot;
mod windowed;

pub use snapshot::{DuplicateGrants, EmptyGroups, EmptyPermissionRoles, Inactivity, OrphanRoleAssignments};
pub use windowed::{FailedLogins, HighActivitySources, OffHoursAdminActions};

use vigil_config::AuditPolicy;

use crate::{Dataset, Finding, FindingCode};

/// A heuristic producing findings of a single code.
pub trait Evaluator: Send + Sync {
  fn code(&self) -> FindingCode;

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding>;
}

/// Failed logins, high-activity sources and off-hours admin actions.
pub fn activity_evaluators(policy: &AuditPolicy) -> Vec<Box<dyn Evaluator>> {
  vec![
    Box::new(FailedLogins::from_policy(policy)),
    Box::new(HighActivitySources::from_policy(policy)),
    Box::new(OffHoursAdminActions::from_policy(policy)),
  ]
}

/// Users without roles, roles without permissions and empty groups.
pub fn permission_evaluators() -> Vec<Box<dyn Evaluator>> {
  vec![
    Box::new(OrphanRoleAssignments),
    Box::new(EmptyPermissionRoles),
    Box::new(EmptyGroups),
  ]
}

/// Every evaluator, in finding code order.
pub fn standard_evaluators(policy: &AuditPolicy) -> Vec<Box<dyn Evaluator>> {
  let mut evaluators = activity_evaluators(policy);
  evaluators.extend(permission_evaluators());
  evaluators.push(Box::new(DuplicateGrants));
  evaluators.push(Box::new(Inactivity::from_policy(policy)));
  evaluators
}

/// Run evaluators in sequence and concatenate their findings.
pub fn evaluate_all(evaluators: &[Box<dyn Evaluator>], dataset: &Dataset) -> Vec<Finding> {
  evaluators
    .iter()
    .flat_map(|evaluator| evaluator.evaluate(dataset))
    .collect()
}
