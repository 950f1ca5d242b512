//! PostgreSQL query executor.
//!
//! Every query is wrapped as `WITH q AS (<sql>) SELECT row_to_json(q) FROM q`
//! so rows come back as JSON objects regardless of column types. The CTE form
//! keeps data-modifying statements (`DELETE ... RETURNING`) legal.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use crate::error::HostError;
use crate::query::{Query, QueryExecutor, QueryParam, Row};

pub struct PgQueryExecutor {
  pool: PgPool,
}

impl PgQueryExecutor {
  /// Connect a pool to the given database URL.
  pub async fn connect(url: &str, max_connections: u32) -> Result<Self, HostError> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(url)
      .await
      .map_err(|e| HostError::connection(e.to_string()))?;
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
  async fn execute(&self, query: &Query, params: &[QueryParam]) -> Result<Vec<Row>, HostError> {
    debug!(query = %query.name, params = params.len(), "executing query");

    let sql = format!("WITH q AS ({}) SELECT row_to_json(q) FROM q", query.sql);
    let mut statement = sqlx::query_scalar::<_, serde_json::Value>(&sql);
    for param in params {
      statement = match param {
        QueryParam::Timestamp(ts) => statement.bind(*ts),
        QueryParam::Int(value) => statement.bind(*value),
        QueryParam::Text(value) => statement.bind(value.clone()),
      };
    }

    let values = statement
      .fetch_all(&self.pool)
      .await
      .map_err(|e| classify(query, e))?;

    values
      .into_iter()
      .map(|value| match value {
        serde_json::Value::Object(row) => Ok(row),
        other => Err(HostError::query(
          query.name.as_ref(),
          format!("expected a row object, got {}", other),
        )),
      })
      .collect()
  }
}

fn classify(query: &Query, error: sqlx::Error) -> HostError {
  match error {
    sqlx::Error::Io(_)
    | sqlx::Error::Tls(_)
    | sqlx::Error::PoolTimedOut
    | sqlx::Error::PoolClosed
    | sqlx::Error::WorkerCrashed => HostError::connection(error.to_string()),
    other => HostError::query(query.name.as_ref(), other.to_string()),
  }
}
