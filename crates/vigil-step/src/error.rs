use serde::{Deserialize, Serialize};
use thiserror::Error;
use vigil_host::HostError;

/// Errors a unit of work can return.
#[derive(Debug, Error)]
pub enum StepError {
  /// A host capability failed (connection, query or spawn).
  #[error(transparent)]
  Host(#[from] HostError),

  /// An external command exited unsuccessfully.
  #[error("command '{command}' exited with code {exit_code}: {stderr}")]
  CommandFailed {
    command: String,
    exit_code: i32,
    stderr: String,
  },

  /// A returned row did not have the expected shape.
  #[error("invalid row: {message}")]
  InvalidRow { message: String },

  /// The step needs the result of a step it does not depend on.
  #[error("missing upstream result for step '{step}'")]
  MissingUpstream { step: String },

  /// The unit of work panicked.
  #[error("step panicked: {message}")]
  Panicked { message: String },

  #[error("{message}")]
  Other { message: String },
}

impl StepError {
  pub fn invalid_row(message: impl Into<String>) -> Self {
    Self::InvalidRow {
      message: message.into(),
    }
  }

  pub fn other(message: impl Into<String>) -> Self {
    Self::Other {
      message: message.into(),
    }
  }
}

/// A step failure as recorded in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("step '{step}' failed: {cause}")]
pub struct StepExecutionError {
  pub step: String,
  pub cause: String,
}

impl StepExecutionError {
  pub fn new(step: impl Into<String>, error: &StepError) -> Self {
    Self {
      step: step.into(),
      cause: error.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_execution_error_captures_cause() {
    let error = StepError::CommandFailed {
      command: "pg_dump".to_string(),
      exit_code: 1,
      stderr: "connection refused".to_string(),
    };

    let captured = StepExecutionError::new("backup", &error);

    assert_eq!(captured.step, "backup");
    assert_eq!(
      captured.cause,
      "command 'pg_dump' exited with code 1: connection refused"
    );
    assert_eq!(
      captured.to_string(),
      "step 'backup' failed: command 'pg_dump' exited with code 1: connection refused"
    );
  }

  #[test]
  fn test_host_errors_are_transparent() {
    let error: StepError = HostError::connection("timed out").into();
    assert_eq!(error.to_string(), HostError::connection("timed out").to_string());
  }
}
