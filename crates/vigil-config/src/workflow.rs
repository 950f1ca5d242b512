use serde::{Deserialize, Serialize};

use crate::enums::RetryBackoff;
use crate::policy::AuditPolicy;
use crate::step::StepDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retries: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_backoff: Option<RetryBackoff>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_delay_ms: Option<u64>,
  /// Upper bound on concurrently running steps. Unbounded when absent.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<usize>,
  #[serde(default)]
  pub policy: AuditPolicy,
  pub steps: Vec<StepDef>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::step::StepKind;

  #[test]
  fn test_parse_workflow() {
    let def: WorkflowDef = serde_json::from_str(
      r#"{
        "workflow_id": "user_maintenance",
        "name": "User maintenance",
        "max_retries": 1,
        "retry_delay_ms": 300000,
        "policy": { "inactivity_days": 120 },
        "steps": [
          { "step_id": "inactive", "type": "inactive_users" },
          { "step_id": "audit", "type": "permission_audit" },
          { "step_id": "report", "type": "user_report", "depends_on": ["inactive", "audit"] }
        ]
      }"#,
    )
    .unwrap();

    assert_eq!(def.max_retries, Some(1));
    assert_eq!(def.retry_backoff, None);
    assert_eq!(def.policy.inactivity_days, 120);
    assert_eq!(def.policy.failed_login_threshold, 3);
    assert_eq!(def.steps.len(), 3);
    assert_eq!(
      def.steps[2].kind,
      StepKind::UserReport { new_user_days: 30 }
    );
  }
}
