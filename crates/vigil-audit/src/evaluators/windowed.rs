use std::collections::BTreeMap;

use chrono::{TimeDelta, Timelike};
use vigil_config::{AuditPolicy, BusinessHours};

use super::Evaluator;
use crate::{Dataset, Finding, FindingCode, Subject};

fn minutes(value: u64) -> TimeDelta {
  i64::try_from(value)
    .ok()
    .and_then(TimeDelta::try_minutes)
    .unwrap_or(TimeDelta::MAX)
}

/// Repeated failed logins by one user inside the login window.
#[derive(Debug, Clone)]
pub struct FailedLogins {
  pub action: String,
  pub window: TimeDelta,
  /// Attempts at or above this count are flagged.
  pub threshold: usize,
}

impl FailedLogins {
  pub fn from_policy(policy: &AuditPolicy) -> Self {
    Self {
      action: policy.failed_login_action.clone(),
      window: minutes(policy.failed_login_window_minutes),
      threshold: policy.failed_login_threshold,
    }
  }
}

impl Evaluator for FailedLogins {
  fn code(&self) -> FindingCode {
    FindingCode::MultipleFailedLogins
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let mut attempts: BTreeMap<&str, u64> = BTreeMap::new();
    for event in dataset.window(self.window).events() {
      if event.action != self.action {
        continue;
      }
      if let Some(user) = event.user_id.as_deref() {
        *attempts.entry(user).or_default() += 1;
      }
    }

    let threshold = self.threshold as u64;
    attempts
      .into_iter()
      .filter(|(_, count)| *count >= threshold)
      .map(|(user, count)| Finding::new(self.code(), Subject::User(user.to_string()), count, threshold))
      .collect()
  }
}

/// Source addresses producing more events than the threshold.
#[derive(Debug, Clone)]
pub struct HighActivitySources {
  pub window: TimeDelta,
  /// Counts strictly above this are flagged.
  pub threshold: usize,
}

impl HighActivitySources {
  pub fn from_policy(policy: &AuditPolicy) -> Self {
    Self {
      window: minutes(policy.activity_window_minutes),
      threshold: policy.high_activity_threshold,
    }
  }
}

impl Evaluator for HighActivitySources {
  fn code(&self) -> FindingCode {
    FindingCode::HighActivityIp
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let mut per_ip: BTreeMap<&str, u64> = BTreeMap::new();
    for event in dataset.window(self.window).events() {
      if let Some(ip) = event.ip_address.as_deref() {
        *per_ip.entry(ip).or_default() += 1;
      }
    }

    let threshold = self.threshold as u64;
    per_ip
      .into_iter()
      .filter(|(_, count)| *count > threshold)
      .map(|(ip, count)| Finding::new(self.code(), Subject::Ip(ip.to_string()), count, threshold))
      .collect()
  }
}

/// Administrative actions outside business hours, one finding per user.
#[derive(Debug, Clone)]
pub struct OffHoursAdminActions {
  pub window: TimeDelta,
  pub admin_actions: Vec<String>,
  pub business_hours: BusinessHours,
}

impl OffHoursAdminActions {
  pub fn from_policy(policy: &AuditPolicy) -> Self {
    Self {
      window: minutes(policy.activity_window_minutes),
      admin_actions: policy.admin_actions.clone(),
      business_hours: policy.business_hours,
    }
  }
}

impl Evaluator for OffHoursAdminActions {
  fn code(&self) -> FindingCode {
    FindingCode::OffHoursAdminAction
  }

  fn evaluate(&self, dataset: &Dataset) -> Vec<Finding> {
    let mut per_user: BTreeMap<&str, u64> = BTreeMap::new();
    for event in dataset.window(self.window).events() {
      if !self.admin_actions.iter().any(|a| *a == event.action) {
        continue;
      }
      if self.business_hours.contains(event.timestamp.hour()) {
        continue;
      }
      if let Some(user) = event.user_id.as_deref() {
        *per_user.entry(user).or_default() += 1;
      }
    }

    per_user
      .into_iter()
      .map(|(user, count)| Finding::new(self.code(), Subject::User(user.to_string()), count, 1))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::AuditEvent;
  use chrono::{DateTime, TimeZone, Utc};

  fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 19, 22, 0, 0).unwrap()
  }

  fn event(user: Option<&str>, action: &str, ip: Option<&str>, minutes_ago: i64) -> AuditEvent {
    AuditEvent {
      user_id: user.map(str::to_string),
      action: action.to_string(),
      ip_address: ip.map(str::to_string),
      timestamp: as_of() - TimeDelta::minutes(minutes_ago),
    }
  }

  fn dataset(events: Vec<AuditEvent>) -> Dataset {
    let mut dataset = Dataset::new(as_of());
    dataset.events = events;
    dataset
  }

  #[test]
  fn test_failed_logins_flags_only_subjects_at_threshold() {
    let dataset = dataset(vec![
      event(Some("u1"), "LOGIN_FAILED", None, 5),
      event(Some("u1"), "LOGIN_FAILED", None, 20),
      event(Some("u1"), "LOGIN_FAILED", None, 59),
      event(Some("u2"), "LOGIN_FAILED", None, 10),
      event(Some("u2"), "LOGIN_FAILED", None, 15),
      // outside the window
      event(Some("u2"), "LOGIN_FAILED", None, 90),
      event(Some("u2"), "LOGIN", None, 1),
      event(None, "LOGIN_FAILED", None, 1),
    ]);

    let findings = FailedLogins::from_policy(&AuditPolicy::default()).evaluate(&dataset);

    assert_eq!(
      findings,
      vec![Finding::new(
        FindingCode::MultipleFailedLogins,
        Subject::User("u1".to_string()),
        3,
        3
      )]
    );
  }

  #[test]
  fn test_failed_logins_is_deterministic() {
    let dataset = dataset(vec![
      event(Some("b"), "LOGIN_FAILED", None, 1),
      event(Some("a"), "LOGIN_FAILED", None, 2),
      event(Some("b"), "LOGIN_FAILED", None, 3),
      event(Some("a"), "LOGIN_FAILED", None, 4),
      event(Some("b"), "LOGIN_FAILED", None, 5),
      event(Some("a"), "LOGIN_FAILED", None, 6),
    ]);
    let evaluator = FailedLogins::from_policy(&AuditPolicy::default());

    let first = evaluator.evaluate(&dataset);
    let second = evaluator.evaluate(&dataset);

    assert_eq!(first, second);
    let subjects: Vec<_> = first.iter().map(|f| f.subject.clone()).collect();
    assert_eq!(
      subjects,
      vec![Subject::User("a".to_string()), Subject::User("b".to_string())]
    );
  }

  #[test]
  fn test_high_activity_requires_strictly_more_than_threshold() {
    let mut events: Vec<AuditEvent> = (0..50)
      .map(|i| event(Some("u1"), "VIEW", Some("10.0.0.1"), i))
      .collect();
    events.extend((0..51).map(|i| event(Some("u2"), "VIEW", Some("10.0.0.2"), i)));

    let findings = HighActivitySources::from_policy(&AuditPolicy::default()).evaluate(&dataset(events));

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].subject, Subject::Ip("10.0.0.2".to_string()));
    assert_eq!(findings[0].count, 51);
  }

  #[test]
  fn test_off_hours_admin_actions_grouped_by_user() {
    // as_of is 22:00, so 30 and 90 minutes ago are off-hours; 230 minutes
    // ago is 18:10 which is still inside the inclusive business hours.
    let dataset = dataset(vec![
      event(Some("admin"), "MANAGE_USERS", None, 30),
      event(Some("admin"), "DELETE_DOCUMENTS", None, 90),
      event(Some("other"), "MANAGE_ROLES", None, 230),
      event(Some("viewer"), "VIEW", None, 10),
    ]);

    let findings = OffHoursAdminActions::from_policy(&AuditPolicy::default()).evaluate(&dataset);

    assert_eq!(
      findings,
      vec![Finding::new(
        FindingCode::OffHoursAdminAction,
        Subject::User("admin".to_string()),
        2,
        1
      )]
    );
  }
}
