//! Heuristic policy knobs.
//!
//! Every threshold and window used by the anomaly evaluators lives here so a
//! workflow file can tune detection without code changes. The defaults match
//! the thresholds the audit DAGs were first deployed with.

use serde::{Deserialize, Serialize};

/// Thresholds and windows for the audit heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditPolicy {
  /// Audit action recorded for a failed login.
  pub failed_login_action: String,
  pub failed_login_window_minutes: u64,
  /// Minimum failed attempts by one subject that triggers a finding.
  pub failed_login_threshold: usize,
  /// Window shared by the high-activity and off-hours heuristics.
  pub activity_window_minutes: u64,
  /// A source must exceed (not merely reach) this many events.
  pub high_activity_threshold: usize,
  /// Actions considered administrative.
  pub admin_actions: Vec<String>,
  pub business_hours: BusinessHours,
  pub inactivity_days: u32,
}

impl Default for AuditPolicy {
  fn default() -> Self {
    Self {
      failed_login_action: "LOGIN_FAILED".to_string(),
      failed_login_window_minutes: 60,
      failed_login_threshold: 3,
      activity_window_minutes: 240,
      high_activity_threshold: 50,
      admin_actions: vec![
        "DELETE_DOCUMENTS".to_string(),
        "MANAGE_USERS".to_string(),
        "MANAGE_ROLES".to_string(),
      ],
      business_hours: BusinessHours::default(),
      inactivity_days: 90,
    }
  }
}

impl AuditPolicy {
  /// Check whether an action belongs to the administrative class.
  pub fn is_admin_action(&self, action: &str) -> bool {
    self.admin_actions.iter().any(|a| a == action)
  }
}

/// Business hours, expressed as whole UTC hours.
///
/// Both boundary hours are inside business hours: with the default `8..=18`
/// an action at 18:45 is not off-hours, one at 19:00 is. A range whose start
/// is after its end wraps around midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
  pub start_hour: u32,
  pub end_hour: u32,
}

impl Default for BusinessHours {
  fn default() -> Self {
    Self {
      start_hour: 8,
      end_hour: 18,
    }
  }
}

impl BusinessHours {
  /// Check whether the given hour of day falls inside business hours.
  pub fn contains(&self, hour: u32) -> bool {
    if self.start_hour <= self.end_hour {
      hour >= self.start_hour && hour <= self.end_hour
    } else {
      hour >= self.start_hour || hour <= self.end_hour
    }
  }
}
