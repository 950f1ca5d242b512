use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;
use vigil_audit::{
  AuditEvent, GroupMembership, GroupRecord, LastActivity, PermissionGrant, RoleAssignment,
  RoleRecord, UserRecord,
};
use vigil_host::{Query, QueryExecutor, QueryParam, Row};
use vigil_step::StepError;

use crate::queries;

/// Reads dataset relations through a [`QueryExecutor`].
#[derive(Clone)]
pub struct DatasetLoader {
  db: Arc<dyn QueryExecutor>,
}

impl DatasetLoader {
  pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
    Self { db }
  }

  /// Run a query and decode every row into `T`.
  pub async fn fetch<T: DeserializeOwned>(
    &self,
    query: &Query,
    params: &[QueryParam],
  ) -> Result<Vec<T>, StepError> {
    let rows = self.db.execute(query, params).await?;
    debug!(query = %query.name, rows = rows.len(), "query_completed");
    rows.into_iter().map(|row| decode(query, row)).collect()
  }

  pub async fn users(&self) -> Result<Vec<UserRecord>, StepError> {
    self.fetch(&queries::USERS, &[]).await
  }

  pub async fn roles(&self) -> Result<Vec<RoleRecord>, StepError> {
    self.fetch(&queries::ROLES, &[]).await
  }

  pub async fn groups(&self) -> Result<Vec<GroupRecord>, StepError> {
    self.fetch(&queries::GROUPS, &[]).await
  }

  pub async fn role_assignments(&self) -> Result<Vec<RoleAssignment>, StepError> {
    self.fetch(&queries::USER_ROLES, &[]).await
  }

  pub async fn permission_grants(&self) -> Result<Vec<PermissionGrant>, StepError> {
    self.fetch(&queries::ROLE_PERMISSIONS, &[]).await
  }

  pub async fn group_memberships(&self) -> Result<Vec<GroupMembership>, StepError> {
    self.fetch(&queries::USER_GROUPS, &[]).await
  }

  /// Audit events strictly after `since`.
  pub async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditEvent>, StepError> {
    self
      .fetch(&queries::AUDIT_EVENTS_SINCE, &[QueryParam::Timestamp(since)])
      .await
  }

  pub async fn last_activity(&self) -> Result<Vec<LastActivity>, StepError> {
    self.fetch(&queries::LAST_ACTIVITY, &[]).await
  }
}

fn decode<T: DeserializeOwned>(query: &Query, row: Row) -> Result<T, StepError> {
  serde_json::from_value(serde_json::Value::Object(row))
    .map_err(|e| StepError::invalid_row(format!("{}: {}", query.name, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use serde_json::json;
  use vigil_host::StaticQueryExecutor;

  #[tokio::test]
  async fn test_loader_decodes_rows() {
    let db = StaticQueryExecutor::from_json(json!({
      "users": [
        { "id": 1, "username": "ana", "email": "ana@example.org", "active": true,
          "created_at": "2025-01-02T03:04:05" }
      ],
      "audit_events": [
        { "user_id": 1, "action": "LOGIN", "ip_address": null, "timestamp": "2025-11-19 10:00:00" }
      ]
    }))
    .unwrap();
    let loader = DatasetLoader::new(Arc::new(db));

    let users = loader.users().await.unwrap();
    assert_eq!(users[0].id, "1");
    assert_eq!(
      users[0].created_at,
      Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    );

    let events = loader
      .events_since(Utc.with_ymd_and_hms(2025, 11, 19, 0, 0, 0).unwrap())
      .await
      .unwrap();
    assert_eq!(events[0].user_id.as_deref(), Some("1"));
  }

  #[tokio::test]
  async fn test_malformed_row_is_an_invalid_row_error() {
    let db = StaticQueryExecutor::from_json(json!({
      "roles": [ { "name": "admin" } ]
    }))
    .unwrap();
    let loader = DatasetLoader::new(Arc::new(db));

    let err = loader.roles().await.unwrap_err();
    assert!(matches!(err, StepError::InvalidRow { .. }));
    assert!(err.to_string().contains("roles"));
  }

  #[tokio::test]
  async fn test_query_failure_is_a_host_error() {
    let db = StaticQueryExecutor::new().with_failure("groups", "relation does not exist");
    let loader = DatasetLoader::new(Arc::new(db));

    let err = loader.groups().await.unwrap_err();
    assert!(matches!(err, StepError::Host(_)));
  }
}
