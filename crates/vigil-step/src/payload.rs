use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vigil_audit::stats::{ActivitySummary, AuditCounts, UserReport};
use vigil_audit::{Finding, FindingReport};
use vigil_host::ProcessOutput;

/// Typed output of a step, one variant per step category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StepPayload {
  #[default]
  Empty,
  /// Tables visible to the health check.
  Health { tables: Vec<String> },
  /// Row count per table.
  TableCounts(BTreeMap<String, u64>),
  /// A backup artifact written to disk.
  Backup { path: String },
  Command(ProcessOutput),
  Activity(ActivitySummary),
  Findings(Vec<Finding>),
  AuditCounts(AuditCounts),
  UserReport(UserReport),
  /// Rows removed by a cleanup step.
  Deleted { rows: u64 },
  /// The step is declared but intentionally does nothing yet.
  NotImplemented { reason: String },
  Report(FindingReport),
  Json(serde_json::Value),
}

impl StepPayload {
  /// Findings carried by this payload. Reports are not flattened back.
  pub fn findings(&self) -> &[Finding] {
    match self {
      StepPayload::Findings(findings) => findings,
      _ => &[],
    }
  }
}
