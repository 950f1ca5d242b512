//! Query execution capability.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::HostError;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A named query.
///
/// The name identifies the query in logs and fixtures; the SQL text is what a
/// database-backed executor runs. Positional parameters use `$1`, `$2`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
  pub name: Cow<'static, str>,
  pub sql: Cow<'static, str>,
}

impl Query {
  /// A query whose name and text are known at compile time.
  pub const fn fixed(name: &'static str, sql: &'static str) -> Self {
    Self {
      name: Cow::Borrowed(name),
      sql: Cow::Borrowed(sql),
    }
  }

  /// A query built at runtime.
  pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
    Self {
      name: Cow::Owned(name.into()),
      sql: Cow::Owned(sql.into()),
    }
  }
}

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
  Timestamp(DateTime<Utc>),
  Int(i64),
  Text(String),
}

/// Runs queries against the dataset the maintenance steps inspect.
///
/// Any error is treated by the caller as a failure of the step that issued
/// the query.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
  async fn execute(&self, query: &Query, params: &[QueryParam]) -> Result<Vec<Row>, HostError>;
}

/// In-memory executor that answers queries by name from fixed row sets.
///
/// Parameters are ignored: fixtures are expected to already be the rows the
/// query would return. Unknown query names fail, so a missing fixture shows
/// up as a step failure rather than as silently empty data.
#[derive(Debug, Default)]
pub struct StaticQueryExecutor {
  fixtures: HashMap<String, Vec<Row>>,
  failures: HashMap<String, String>,
  calls: Mutex<Vec<String>>,
}

impl StaticQueryExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build from a JSON object mapping query names to arrays of row objects.
  pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
    let fixtures: HashMap<String, Vec<Row>> = serde_json::from_value(value)?;
    Ok(Self {
      fixtures,
      ..Self::default()
    })
  }

  /// Register the rows returned for a query name.
  pub fn with_rows(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
    self.fixtures.insert(name.into(), rows);
    self
  }

  /// Make a query name fail with the given message.
  pub fn with_failure(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
    self.failures.insert(name.into(), message.into());
    self
  }

  /// Names of the queries executed so far, in call order.
  pub fn calls(&self) -> Vec<String> {
    self
      .calls
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }
}

#[async_trait]
impl QueryExecutor for StaticQueryExecutor {
  async fn execute(&self, query: &Query, _params: &[QueryParam]) -> Result<Vec<Row>, HostError> {
    self
      .calls
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(query.name.to_string());

    if let Some(message) = self.failures.get(query.name.as_ref()) {
      return Err(HostError::query(query.name.as_ref(), message.clone()));
    }

    self
      .fixtures
      .get(query.name.as_ref())
      .cloned()
      .ok_or_else(|| HostError::query(query.name.as_ref(), "no fixture registered"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  const USERS: Query = Query::fixed("users", "SELECT id FROM users");

  #[tokio::test]
  async fn test_static_executor_answers_by_name() {
    let executor = StaticQueryExecutor::from_json(json!({
      "users": [{ "id": "u1" }, { "id": "u2" }]
    }))
    .unwrap();

    let rows = executor.execute(&USERS, &[]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "u1");
    assert_eq!(executor.calls(), vec!["users".to_string()]);
  }

  #[tokio::test]
  async fn test_static_executor_missing_fixture_fails() {
    let executor = StaticQueryExecutor::new();
    let result = executor.execute(&USERS, &[]).await;
    assert!(matches!(result, Err(HostError::Query { .. })));
  }

  #[tokio::test]
  async fn test_static_executor_injected_failure() {
    let executor = StaticQueryExecutor::new()
      .with_rows("users", vec![])
      .with_failure("users", "relation does not exist");

    let err = executor.execute(&USERS, &[]).await.unwrap_err();
    assert!(err.to_string().contains("relation does not exist"));
  }
}
