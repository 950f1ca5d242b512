use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::info;
use vigil_host::{QueryExecutor, QueryParam};
use vigil_step::{StepContext, StepError, StepPayload, Task};

use crate::loader::DatasetLoader;
use crate::queries;

/// Lists the public base tables; fails when the database is unreachable.
pub struct DatabaseHealthTask {
  loader: DatasetLoader,
}

impl DatabaseHealthTask {
  pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
    Self {
      loader: DatasetLoader::new(db),
    }
  }
}

#[derive(Deserialize)]
struct TableName {
  table_name: String,
}

#[async_trait]
impl Task for DatabaseHealthTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let tables: Vec<TableName> = self.loader.fetch(&queries::LIST_TABLES, &[]).await?;
    let tables: Vec<String> = tables.into_iter().map(|t| t.table_name).collect();
    info!(step = %ctx.step, tables = tables.len(), "database_healthy");
    Ok(StepPayload::Health { tables })
  }
}

/// Row counts of a fixed set of tables.
pub struct TableStatisticsTask {
  loader: DatasetLoader,
  tables: Vec<String>,
}

impl TableStatisticsTask {
  pub fn new(db: Arc<dyn QueryExecutor>, tables: Vec<String>) -> Self {
    Self {
      loader: DatasetLoader::new(db),
      tables,
    }
  }
}

#[derive(Deserialize)]
struct RowCount {
  #[serde(deserialize_with = "count::deserialize")]
  count: u64,
}

#[async_trait]
impl Task for TableStatisticsTask {
  async fn run(&self, _ctx: &StepContext) -> Result<StepPayload, StepError> {
    let mut counts = BTreeMap::new();
    for table in &self.tables {
      if !queries::is_identifier(table) {
        return Err(StepError::other(format!("invalid table name '{}'", table)));
      }
      let rows: Vec<RowCount> = self.loader.fetch(&queries::count_rows(table), &[]).await?;
      let count = rows.first().map(|r| r.count).unwrap_or(0);
      counts.insert(table.clone(), count);
    }
    Ok(StepPayload::TableCounts(counts))
  }
}

/// Deletes audit rows older than the retention period.
///
/// The only step that writes; keep it behind the steps that read the audit
/// log if they must see the rows it removes.
pub struct CleanupAuditLogsTask {
  db: Arc<dyn QueryExecutor>,
  retention_days: u32,
}

impl CleanupAuditLogsTask {
  pub fn new(db: Arc<dyn QueryExecutor>, retention_days: u32) -> Self {
    Self { db, retention_days }
  }

  fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now
      .checked_sub_signed(TimeDelta::days(i64::from(self.retention_days)))
      .unwrap_or(DateTime::<Utc>::MIN_UTC)
  }
}

#[async_trait]
impl Task for CleanupAuditLogsTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let cutoff = self.cutoff(ctx.now());
    let rows = self
      .db
      .execute(&queries::DELETE_AUDIT_LOGS, &[QueryParam::Timestamp(cutoff)])
      .await?;
    let deleted = rows.len() as u64;
    info!(step = %ctx.step, cutoff = %cutoff, deleted, "audit_logs_cleaned");
    Ok(StepPayload::Deleted { rows: deleted })
  }
}

/// `COUNT(*)` arrives as a number, or as a string from drivers that map
/// `bigint` to text.
mod count {
  use serde::{Deserialize, Deserializer, de};

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Number(u64),
    Text(String),
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Raw::deserialize(deserializer)? {
      Raw::Number(n) => Ok(n),
      Raw::Text(s) => s.parse().map_err(de::Error::custom),
    }
  }
}
