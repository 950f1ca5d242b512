use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable classification code of a finding.
///
/// Declaration order is the order in which codes appear in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingCode {
  MultipleFailedLogins,
  #[serde(rename = "HighActivityIP")]
  HighActivityIp,
  OffHoursAdminAction,
  UsersWithoutRoles,
  RolesWithoutPermissions,
  EmptyGroups,
  DuplicatePermissions,
  InactiveUser,
}

impl FindingCode {
  pub const ALL: [FindingCode; 8] = [
    FindingCode::MultipleFailedLogins,
    FindingCode::HighActivityIp,
    FindingCode::OffHoursAdminAction,
    FindingCode::UsersWithoutRoles,
    FindingCode::RolesWithoutPermissions,
    FindingCode::EmptyGroups,
    FindingCode::DuplicatePermissions,
    FindingCode::InactiveUser,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      FindingCode::MultipleFailedLogins => "MultipleFailedLogins",
      FindingCode::HighActivityIp => "HighActivityIP",
      FindingCode::OffHoursAdminAction => "OffHoursAdminAction",
      FindingCode::UsersWithoutRoles => "UsersWithoutRoles",
      FindingCode::RolesWithoutPermissions => "RolesWithoutPermissions",
      FindingCode::EmptyGroups => "EmptyGroups",
      FindingCode::DuplicatePermissions => "DuplicatePermissions",
      FindingCode::InactiveUser => "InactiveUser",
    }
  }
}

impl fmt::Display for FindingCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  #[default]
  Low,
  Medium,
  High,
}

impl Severity {
  /// Grade a count against the threshold that triggered it.
  ///
  /// Three times the threshold or more is high, twice or more is medium.
  pub fn from_ratio(count: u64, threshold: u64) -> Self {
    let threshold = threshold.max(1);
    if count >= threshold.saturating_mul(3) {
      Severity::High
    } else if count >= threshold.saturating_mul(2) {
      Severity::Medium
    } else {
      Severity::Low
    }
  }
}

/// What a finding is about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
  User(String),
  Ip(String),
  Role(String),
  Group(String),
  Grant { role: String, permission: String },
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Subject::User(id) => write!(f, "user:{}", id),
      Subject::Ip(ip) => write!(f, "ip:{}", ip),
      Subject::Role(name) => write!(f, "role:{}", name),
      Subject::Group(name) => write!(f, "group:{}", name),
      Subject::Grant { role, permission } => write!(f, "grant:{}/{}", role, permission),
    }
  }
}

/// A single anomaly or inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Finding {
  pub code: FindingCode,
  pub subject: Subject,
  /// Supporting count: events, occurrences or days, depending on the code.
  pub count: u64,
  pub severity: Severity,
}

impl Finding {
  pub fn new(code: FindingCode, subject: Subject, count: u64, threshold: u64) -> Self {
    Self {
      code,
      subject,
      count,
      severity: Severity::from_ratio(count, threshold),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_severity_ratios() {
    assert_eq!(Severity::from_ratio(3, 3), Severity::Low);
    assert_eq!(Severity::from_ratio(5, 3), Severity::Low);
    assert_eq!(Severity::from_ratio(6, 3), Severity::Medium);
    assert_eq!(Severity::from_ratio(9, 3), Severity::High);
    assert_eq!(Severity::from_ratio(1, 0), Severity::Low);
    assert_eq!(Severity::from_ratio(0, 0), Severity::Low);
  }

  #[test]
  fn test_codes_are_declared_in_report_order() {
    let mut sorted = FindingCode::ALL;
    sorted.sort();
    assert_eq!(sorted, FindingCode::ALL);
    assert_eq!(FindingCode::ALL.first(), Some(&FindingCode::MultipleFailedLogins));
    assert_eq!(FindingCode::ALL.last(), Some(&FindingCode::InactiveUser));
  }

  #[test]
  fn test_finding_serializes_with_stable_code_names() {
    let finding = Finding::new(FindingCode::HighActivityIp, Subject::Ip("10.0.0.1".into()), 51, 50);
    let json = serde_json::to_value(&finding).unwrap();

    assert_eq!(json["code"], "HighActivityIP");
    assert_eq!(json["subject"]["kind"], "ip");
    assert_eq!(json["subject"]["id"], "10.0.0.1");
    assert_eq!(json["severity"], "low");
  }
}
