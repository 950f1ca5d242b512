use thiserror::Error;

/// Errors raised while building a graph. A workflow with any of these never
/// runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("duplicate step name: {step}")]
  DuplicateStep { step: String },

  #[error("step '{step}' depends on unknown step '{dependency}'")]
  UnknownDependency { step: String, dependency: String },

  /// `path` starts and ends with the same step.
  #[error("cycle detected: {}", path.join(" -> "))]
  Cycle { path: Vec<String> },
}
