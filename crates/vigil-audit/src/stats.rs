//! Activity and user summaries for the reporting steps.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Dataset;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
  pub user_id: String,
  pub username: Option<String>,
  pub actions: u64,
  #[serde(with = "crate::dataset::timestamp")]
  pub last_action: DateTime<Utc>,
}

/// Most active users inside a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
  #[serde(with = "crate::dataset::timestamp")]
  pub window_start: DateTime<Utc>,
  #[serde(with = "crate::dataset::timestamp")]
  pub window_end: DateTime<Utc>,
  pub users: Vec<UserActivity>,
}

/// Rank users by number of audit events in `(as_of - span, as_of]`.
///
/// Ties are broken by user id. At most `limit` users are returned.
pub fn user_activity(dataset: &Dataset, span: TimeDelta, limit: usize) -> ActivitySummary {
  let window = dataset.window(span);
  let mut per_user: HashMap<&str, (u64, DateTime<Utc>)> = HashMap::new();
  for event in window.events() {
    let Some(user) = event.user_id.as_deref() else {
      continue;
    };
    let entry = per_user.entry(user).or_insert((0, event.timestamp));
    entry.0 += 1;
    entry.1 = entry.1.max(event.timestamp);
  }

  let mut users: Vec<UserActivity> = per_user
    .into_iter()
    .map(|(user, (actions, last_action))| UserActivity {
      user_id: user.to_string(),
      username: dataset.user(user).map(|u| u.username.clone()),
      actions,
      last_action,
    })
    .collect();
  users.sort_by(|a, b| b.actions.cmp(&a.actions).then_with(|| a.user_id.cmp(&b.user_id)));
  users.truncate(limit);

  ActivitySummary {
    window_start: window.start,
    window_end: window.end,
    users,
  }
}

/// Event totals over a reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounts {
  pub period_hours: u32,
  pub total_events: u64,
  pub active_users: u64,
  pub actions_by_type: BTreeMap<String, u64>,
}

pub fn audit_counts(dataset: &Dataset, period_hours: u32) -> AuditCounts {
  let window = dataset.window(TimeDelta::hours(i64::from(period_hours)));
  let mut actions_by_type: BTreeMap<String, u64> = BTreeMap::new();
  let mut users: BTreeSet<&str> = BTreeSet::new();
  for event in window.events() {
    *actions_by_type.entry(event.action.clone()).or_default() += 1;
    if let Some(user) = event.user_id.as_deref() {
      users.insert(user);
    }
  }

  AuditCounts {
    period_hours,
    total_events: window.len() as u64,
    active_users: users.len() as u64,
    actions_by_type,
  }
}

/// Account totals and role/group membership counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReport {
  pub total_active: u64,
  pub total_inactive: u64,
  /// Distinct holders per role name, including roles nobody holds.
  pub users_by_role: BTreeMap<String, u64>,
  /// Members per group name, including empty groups.
  pub users_by_group: BTreeMap<String, u64>,
  /// Accounts created within the last `new_user_days`.
  pub new_users: u64,
}

pub fn user_report(dataset: &Dataset, new_user_days: u32) -> UserReport {
  let active: BTreeSet<&str> = dataset
    .users
    .iter()
    .filter(|u| u.active)
    .map(|u| u.id.as_str())
    .collect();
  let total_inactive = dataset.users.iter().filter(|u| !u.active).count() as u64;

  // Every role appears, held or not; holders count whether active or not.
  let mut role_members: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
  for role in &dataset.roles {
    let holders = role_members.entry(role.name.as_str()).or_default();
    holders.extend(
      dataset
        .role_assignments
        .iter()
        .filter(|a| a.role_id == role.id)
        .map(|a| a.user_id.as_str()),
    );
  }
  let users_by_role = role_members
    .into_iter()
    .map(|(role, members)| (role.to_string(), members.len() as u64))
    .collect();

  let mut users_by_group: BTreeMap<String, u64> = BTreeMap::new();
  for group in &dataset.groups {
    let members: BTreeSet<&str> = dataset
      .group_memberships
      .iter()
      .filter(|m| m.group_id == group.id)
      .map(|m| m.user_id.as_str())
      .collect();
    *users_by_group.entry(group.name.clone()).or_default() += members.len() as u64;
  }

  let since = dataset
    .as_of
    .checked_sub_signed(TimeDelta::days(i64::from(new_user_days)))
    .unwrap_or(DateTime::<Utc>::MIN_UTC);
  let new_users = dataset.users.iter().filter(|u| u.created_at > since).count() as u64;

  UserReport {
    total_active: active.len() as u64,
    total_inactive,
    users_by_role,
    users_by_group,
    new_users,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{AuditEvent, GroupMembership, GroupRecord, RoleAssignment, RoleRecord, UserRecord};
  use chrono::TimeZone;

  fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 19, 12, 0, 0).unwrap()
  }

  fn event(user: &str, action: &str, hours_ago: i64) -> AuditEvent {
    AuditEvent {
      user_id: Some(user.to_string()),
      action: action.to_string(),
      ip_address: None,
      timestamp: as_of() - TimeDelta::hours(hours_ago),
    }
  }

  fn user(id: &str, active: bool, created_days_ago: i64) -> UserRecord {
    UserRecord {
      id: id.to_string(),
      username: format!("name-{}", id),
      email: None,
      active,
      created_at: as_of() - TimeDelta::days(created_days_ago),
    }
  }

  #[test]
  fn test_user_activity_ranks_and_limits() {
    let mut dataset = Dataset::new(as_of());
    dataset.users = vec![user("a", true, 10)];
    dataset.events = vec![
      event("a", "LOGIN", 1),
      event("a", "VIEW", 2),
      event("b", "LOGIN", 1),
      event("c", "LOGIN", 1),
      event("c", "VIEW", 3),
      event("a", "VIEW", 30),
    ];

    let summary = user_activity(&dataset, TimeDelta::hours(4), 2);

    let ranked: Vec<(&str, u64)> = summary
      .users
      .iter()
      .map(|u| (u.user_id.as_str(), u.actions))
      .collect();
    assert_eq!(ranked, vec![("a", 2), ("c", 2)]);
    assert_eq!(summary.users[0].username.as_deref(), Some("name-a"));
    assert_eq!(summary.users[0].last_action, as_of() - TimeDelta::hours(1));
  }

  #[test]
  fn test_audit_counts_over_period() {
    let mut dataset = Dataset::new(as_of());
    dataset.events = vec![
      event("a", "LOGIN", 1),
      event("a", "LOGIN", 2),
      event("b", "DELETE_DOCUMENTS", 23),
      event("b", "LOGIN", 25),
    ];

    let counts = audit_counts(&dataset, 24);

    assert_eq!(counts.total_events, 3);
    assert_eq!(counts.active_users, 2);
    assert_eq!(counts.actions_by_type.get("LOGIN"), Some(&2));
    assert_eq!(counts.actions_by_type.get("DELETE_DOCUMENTS"), Some(&1));
  }

  #[test]
  fn test_user_report_totals() {
    let mut dataset = Dataset::new(as_of());
    dataset.users = vec![user("a", true, 5), user("b", true, 200), user("c", false, 400)];
    dataset.roles = vec![
      RoleRecord {
        id: "1".to_string(),
        name: "admin".to_string(),
      },
      RoleRecord {
        id: "2".to_string(),
        name: "auditor".to_string(),
      },
    ];
    dataset.role_assignments = vec![
      RoleAssignment {
        user_id: "a".to_string(),
        role_id: "1".to_string(),
      },
      RoleAssignment {
        user_id: "c".to_string(),
        role_id: "1".to_string(),
      },
      RoleAssignment {
        user_id: "a".to_string(),
        role_id: "1".to_string(),
      },
    ];
    dataset.groups = vec![
      GroupRecord {
        id: "g1".to_string(),
        name: "ops".to_string(),
      },
      GroupRecord {
        id: "g2".to_string(),
        name: "empty".to_string(),
      },
    ];
    dataset.group_memberships = vec![GroupMembership {
      group_id: "g1".to_string(),
      user_id: "b".to_string(),
    }];

    let report = user_report(&dataset, 30);

    assert_eq!(report.total_active, 2);
    assert_eq!(report.total_inactive, 1);
    // "c" is inactive but still holds the role; "a" is assigned twice.
    assert_eq!(report.users_by_role.get("admin"), Some(&2));
    assert_eq!(report.users_by_role.get("auditor"), Some(&0));
    assert_eq!(report.users_by_group.get("ops"), Some(&1));
    assert_eq!(report.users_by_group.get("empty"), Some(&0));
    assert_eq!(report.new_users, 1);
  }
}
