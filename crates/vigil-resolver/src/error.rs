use thiserror::Error;
use vigil_workflow::GraphError;

/// Errors that can occur during workflow resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The workflow declares no steps.
  #[error("workflow '{workflow}' has no steps")]
  Empty { workflow: String },

  /// A step's configuration cannot be turned into a task.
  #[error("invalid step '{step}': {message}")]
  InvalidStep { step: String, message: String },

  /// The dependency graph is invalid.
  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl ResolveError {
  pub(crate) fn invalid_step(step: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidStep {
      step: step.into(),
      message: message.into(),
    }
  }
}
