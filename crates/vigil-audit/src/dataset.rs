//! Dataset snapshot and time windows.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One row of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
  #[serde(default, deserialize_with = "ids::optional")]
  pub user_id: Option<String>,
  pub action: String,
  #[serde(default)]
  pub ip_address: Option<String>,
  #[serde(with = "timestamp")]
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  #[serde(deserialize_with = "ids::required")]
  pub id: String,
  pub username: String,
  #[serde(default)]
  pub email: Option<String>,
  pub active: bool,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
  #[serde(deserialize_with = "ids::required")]
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
  #[serde(deserialize_with = "ids::required")]
  pub id: String,
  pub name: String,
}

/// A row of the user/role relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
  #[serde(deserialize_with = "ids::required")]
  pub user_id: String,
  #[serde(deserialize_with = "ids::required")]
  pub role_id: String,
}

/// A row of the role/permission relation. The relation has no uniqueness
/// constraint, so the same pair may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
  #[serde(deserialize_with = "ids::required")]
  pub role_id: String,
  #[serde(deserialize_with = "ids::required")]
  pub permission_id: String,
}

/// A row of the group/user relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
  #[serde(deserialize_with = "ids::required")]
  pub group_id: String,
  #[serde(deserialize_with = "ids::required")]
  pub user_id: String,
}

/// Most recent audit timestamp of a user, pre-aggregated by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastActivity {
  #[serde(deserialize_with = "ids::required")]
  pub user_id: String,
  #[serde(with = "timestamp")]
  pub last_activity: DateTime<Utc>,
}

/// Everything the heuristics look at, captured at `as_of`.
///
/// A loader fills only the relations the evaluators it feeds need; the rest
/// stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
  pub as_of: DateTime<Utc>,
  #[serde(default)]
  pub users: Vec<UserRecord>,
  #[serde(default)]
  pub roles: Vec<RoleRecord>,
  #[serde(default)]
  pub groups: Vec<GroupRecord>,
  #[serde(default)]
  pub role_assignments: Vec<RoleAssignment>,
  #[serde(default)]
  pub permission_grants: Vec<PermissionGrant>,
  #[serde(default)]
  pub group_memberships: Vec<GroupMembership>,
  #[serde(default)]
  pub events: Vec<AuditEvent>,
  #[serde(default)]
  pub last_activity: Vec<LastActivity>,
}

impl Dataset {
  pub fn new(as_of: DateTime<Utc>) -> Self {
    Self {
      as_of,
      ..Self::default()
    }
  }

  /// Events in the half-open interval `(as_of - span, as_of]`.
  pub fn window(&self, span: TimeDelta) -> EventWindow<'_> {
    let end = self.as_of;
    let start = end.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let events = self
      .events
      .iter()
      .filter(|e| e.timestamp > start && e.timestamp <= end)
      .collect();
    EventWindow { start, end, events }
  }

  /// Look up a user by id.
  pub fn user(&self, id: &str) -> Option<&UserRecord> {
    self.users.iter().find(|u| u.id == id)
  }

  /// Name of a role, falling back to its id for dangling references.
  pub fn role_name<'a>(&'a self, role_id: &'a str) -> &'a str {
    self
      .roles
      .iter()
      .find(|r| r.id == role_id)
      .map(|r| r.name.as_str())
      .unwrap_or(role_id)
  }
}

/// A view of the audit events inside a time interval.
#[derive(Debug, Clone)]
pub struct EventWindow<'a> {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
  events: Vec<&'a AuditEvent>,
}

impl<'a> EventWindow<'a> {
  pub fn events(&self) -> impl Iterator<Item = &'a AuditEvent> + '_ {
    self.events.iter().copied()
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }
}

/// Timestamps with or without an offset. Offset-less values are UTC.
pub(crate) mod timestamp {
  use chrono::{DateTime, NaiveDateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de};

  const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

  pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
  }

  pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
      return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
      .map(|naive| naive.and_utc())
  }
}

/// Identifiers arrive as strings or as integer keys.
mod ids {
  use serde::{Deserialize, Deserializer};

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Number(i64),
  }

  impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
      match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
      }
    }
  }

  pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
  }

  pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use serde_json::json;

  fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 19, h, m, 0).unwrap()
  }

  fn event(ts: DateTime<Utc>) -> AuditEvent {
    AuditEvent {
      user_id: Some("u1".to_string()),
      action: "LOGIN".to_string(),
      ip_address: None,
      timestamp: ts,
    }
  }

  #[test]
  fn test_window_is_half_open() {
    let mut dataset = Dataset::new(at(12, 0));
    dataset.events = vec![event(at(11, 0)), event(at(11, 1)), event(at(12, 0)), event(at(12, 1))];

    let window = dataset.window(TimeDelta::hours(1));
    let stamps: Vec<_> = window.events().map(|e| e.timestamp).collect();

    assert_eq!(stamps, vec![at(11, 1), at(12, 0)]);
    assert_eq!(window.start, at(11, 0));
    assert_eq!(window.end, at(12, 0));
  }

  #[test]
  fn test_event_accepts_naive_timestamps_and_numeric_ids() {
    let event: AuditEvent = serde_json::from_value(json!({
      "user_id": 42,
      "action": "LOGIN_FAILED",
      "ip_address": "10.0.0.1",
      "timestamp": "2025-11-19T03:04:05.123456"
    }))
    .unwrap();

    assert_eq!(event.user_id.as_deref(), Some("42"));
    assert_eq!(
      event.timestamp,
      Utc.with_ymd_and_hms(2025, 11, 19, 3, 4, 5).unwrap() + TimeDelta::microseconds(123456)
    );
  }

  #[test]
  fn test_event_accepts_offset_timestamps_and_missing_user() {
    let event: AuditEvent = serde_json::from_value(json!({
      "action": "LOGIN_FAILED",
      "timestamp": "2025-11-19T05:00:00+02:00"
    }))
    .unwrap();

    assert_eq!(event.user_id, None);
    assert_eq!(event.timestamp, at(3, 0));
  }

  #[test]
  fn test_invalid_timestamp_is_rejected() {
    let result: Result<AuditEvent, _> = serde_json::from_value(json!({
      "action": "LOGIN",
      "timestamp": "yesterday"
    }));
    assert!(result.is_err());
  }

  #[test]
  fn test_role_name_falls_back_to_id() {
    let mut dataset = Dataset::new(at(0, 0));
    dataset.roles.push(RoleRecord {
      id: "1".to_string(),
      name: "admin".to_string(),
    });
    assert_eq!(dataset.role_name("1"), "admin");
    assert_eq!(dataset.role_name("9"), "9");
  }
}
