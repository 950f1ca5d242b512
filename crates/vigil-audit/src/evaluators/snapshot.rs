use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use vigil_config::AuditPolicy;

use super::Evaluator;
use crate::{Dataset, Finding, FindingCode, Subject};

/// Active users with no role assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrphanRoleAssignments;

impl Evaluator for OrphanRoleAssignments {
  fn code(&self) -> FindingCode {
    FindingCode::UsersWithoutRoles
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let assigned: HashSet<&str> = dataset
      .role_assignments
      .iter()
      .map(|a| a.user_id.as_str())
      .collect();

    let mut findings: Vec<Finding> = dataset
      .users
      .iter()
      .filter(|u| u.active && !assigned.contains(u.id.as_str()))
      .map(|u| Finding::new(self.code(), Subject::User(u.id.clone()), 0, 1))
      .collect();
    findings.sort();
    findings.dedup();
    findings
  }
}

/// Roles granted no permission at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPermissionRoles;

impl Evaluator for EmptyPermissionRoles {
  fn code(&self) -> FindingCode {
    FindingCode::RolesWithoutPermissions
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let granted: HashSet<&str> = dataset
      .permission_grants
      .iter()
      .map(|g| g.role_id.as_str())
      .collect();

    let mut findings: Vec<Finding> = dataset
      .roles
      .iter()
      .filter(|r| !granted.contains(r.id.as_str()))
      .map(|r| Finding::new(self.code(), Subject::Role(r.name.clone()), 0, 1))
      .collect();
    findings.sort();
    findings.dedup();
    findings
  }
}

/// Groups with no row in the membership relation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyGroups;

impl Evaluator for EmptyGroups {
  fn code(&self) -> FindingCode {
    FindingCode::EmptyGroups
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let populated: HashSet<&str> = dataset
      .group_memberships
      .iter()
      .map(|m| m.group_id.as_str())
      .collect();

    let mut findings: Vec<Finding> = dataset
      .groups
      .iter()
      .filter(|g| !populated.contains(g.id.as_str()))
      .map(|g| Finding::new(self.code(), Subject::Group(g.name.clone()), 0, 1))
      .collect();
    findings.sort();
    findings.dedup();
    findings
  }
}

/// `(role, permission)` pairs granted more than once.
///
/// Detection only: nothing here, nor in the step wrapping it, removes the
/// extra rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateGrants;

impl Evaluator for DuplicateGrants {
  fn code(&self) -> FindingCode {
    FindingCode::DuplicatePermissions
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let mut occurrences: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for grant in &dataset.permission_grants {
      *occurrences
        .entry((grant.role_id.as_str(), grant.permission_id.as_str()))
        .or_default() += 1;
    }

    let mut findings: Vec<Finding> = occurrences
      .into_iter()
      .filter(|(_, count)| *count > 1)
      .map(|((role_id, permission_id), count)| {
        let subject = Subject::Grant {
          role: dataset.role_name(role_id).to_string(),
          permission: permission_id.to_string(),
        };
        Finding::new(self.code(), subject, count, 2)
      })
      .collect();
    findings.sort();
    findings
  }
}

/// Active users whose last activity is older than the inactivity limit.
///
/// Last activity is the latest audit event of the user, falling back to the
/// account creation time when there is none.
#[derive(Debug, Clone, Copy)]
pub struct Inactivity {
  pub days: u32,
}

impl Inactivity {
  pub fn from_policy(policy: &AuditPolicy) -> Self {
    Self {
      days: policy.inactivity_days,
    }
  }
}

impl Evaluator for Inactivity {
  fn code(&self) -> FindingCode {
    FindingCode::InactiveUser
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
    let observed = dataset
      .events
      .iter()
      .filter_map(|e| e.user_id.as_deref().map(|u| (u, e.timestamp)))
      .chain(
        dataset
          .last_activity
          .iter()
          .map(|a| (a.user_id.as_str(), a.last_activity)),
      );
    for (user, ts) in observed {
      latest
        .entry(user)
        .and_modify(|current| *current = (*current).max(ts))
        .or_insert(ts);
    }

    let cutoff = dataset
      .as_of
      .checked_sub_signed(TimeDelta::days(i64::from(self.days)))
      .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut findings: Vec<Finding> = dataset
      .users
      .iter()
      .filter(|u| u.active)
      .filter_map(|u| {
        let last = latest.get(u.id.as_str()).copied().unwrap_or(u.created_at);
        if last >= cutoff {
          return None;
        }
        let idle_days = (dataset.as_of - last).num_days().max(0) as u64;
        Some(Finding::new(
          self.code(),
          Subject::User(u.id.clone()),
          idle_days,
          u64::from(self.days),
        ))
      })
      .collect();
    findings.sort();
    findings.dedup();
    findings
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    AuditEvent, GroupMembership, GroupRecord, PermissionGrant, RoleAssignment, RoleRecord,
    UserRecord,
  };
  use chrono::TimeZone;

  fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 19, 12, 0, 0).unwrap()
  }

  fn user(id: &str, active: bool, created_days_ago: i64) -> UserRecord {
    UserRecord {
      id: id.to_string(),
      username: format!("user-{}", id),
      email: None,
      active,
      created_at: as_of() - TimeDelta::days(created_days_ago),
    }
  }

  fn role(id: &str, name: &str) -> RoleRecord {
    RoleRecord {
      id: id.to_string(),
      name: name.to_string(),
    }
  }

  fn grant(role_id: &str, permission_id: &str) -> PermissionGrant {
    PermissionGrant {
      role_id: role_id.to_string(),
      permission_id: permission_id.to_string(),
    }
  }

  #[test]
  fn test_inactivity_uses_creation_time_without_events() {
    let mut dataset = Dataset::new(as_of());
    dataset.users = vec![user("old", true, 120), user("recent", true, 120)];
    dataset.events = vec![AuditEvent {
      user_id: Some("recent".to_string()),
      action: "LOGIN".to_string(),
      ip_address: None,
      timestamp: as_of() - TimeDelta::days(10),
    }];

    let findings = Inactivity::from_policy(&AuditPolicy::default()).evaluate(&dataset);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, FindingCode::InactiveUser);
    assert_eq!(findings[0].subject, Subject::User("old".to_string()));
    assert!(findings[0].count >= 90);
  }

  #[test]
  fn test_inactivity_ignores_inactive_accounts_and_honors_last_activity() {
    let mut dataset = Dataset::new(as_of());
    dataset.users = vec![user("disabled", false, 400), user("tracked", true, 400)];
    dataset.last_activity = vec![crate::LastActivity {
      user_id: "tracked".to_string(),
      last_activity: as_of() - TimeDelta::days(3),
    }];

    let findings = Inactivity::from_policy(&AuditPolicy::default()).evaluate(&dataset);

    assert!(findings.is_empty());
  }

  #[test]
  fn test_inactivity_boundary_is_strict() {
    let mut dataset = Dataset::new(as_of());
    dataset.users = vec![user("edge", true, 90), user("over", true, 91)];

    let findings = Inactivity { days: 90 }.evaluate(&dataset);

    let subjects: Vec<_> = findings.into_iter().map(|f| f.subject).collect();
    assert_eq!(subjects, vec![Subject::User("over".to_string())]);
  }

  #[test]
  fn test_empty_groups() {
    let mut dataset = Dataset::new(as_of());
    dataset.groups = vec![
      GroupRecord {
        id: "1".to_string(),
        name: "finance".to_string(),
      },
      GroupRecord {
        id: "2".to_string(),
        name: "legal".to_string(),
      },
    ];
    dataset.group_memberships = vec![GroupMembership {
      group_id: "1".to_string(),
      user_id: "u1".to_string(),
    }];

    let findings = EmptyGroups.evaluate(&dataset);

    assert_eq!(
      findings,
      vec![Finding::new(
        FindingCode::EmptyGroups,
        Subject::Group("legal".to_string()),
        0,
        1
      )]
    );
  }

  #[test]
  fn test_users_without_roles_only_counts_active_users() {
    let mut dataset = Dataset::new(as_of());
    dataset.users = vec![user("a", true, 1), user("b", true, 1), user("c", false, 1)];
    dataset.role_assignments = vec![RoleAssignment {
      user_id: "a".to_string(),
      role_id: "1".to_string(),
    }];

    let subjects: Vec<_> = OrphanRoleAssignments
      .evaluate(&dataset)
      .into_iter()
      .map(|f| f.subject)
      .collect();

    assert_eq!(subjects, vec![Subject::User("b".to_string())]);
  }

  #[test]
  fn test_roles_without_permissions() {
    let mut dataset = Dataset::new(as_of());
    dataset.roles = vec![role("1", "admin"), role("2", "auditor")];
    dataset.permission_grants = vec![grant("1", "10")];

    let findings = EmptyPermissionRoles.evaluate(&dataset);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].subject, Subject::Role("auditor".to_string()));
  }

  #[test]
  fn test_duplicate_grants_counts_occurrences() {
    let mut dataset = Dataset::new(as_of());
    dataset.roles = vec![role("1", "admin")];
    dataset.permission_grants = vec![
      grant("1", "10"),
      grant("1", "10"),
      grant("1", "10"),
      grant("1", "11"),
      grant("7", "12"),
      grant("7", "12"),
    ];

    let findings = DuplicateGrants.evaluate(&dataset);

    assert_eq!(
      findings,
      vec![
        Finding::new(
          FindingCode::DuplicatePermissions,
          Subject::Grant {
            role: "7".to_string(),
            permission: "12".to_string()
          },
          2,
          2
        ),
        Finding::new(
          FindingCode::DuplicatePermissions,
          Subject::Grant {
            role: "admin".to_string(),
            permission: "10".to_string()
          },
          3,
          2
        ),
      ]
    );
  }
}
