use thiserror::Error;

/// Errors raised by host capabilities.
#[derive(Debug, Error)]
pub enum HostError {
  /// The database could not be reached (connect, pool or I/O failure).
  #[error("connection error: {message}")]
  Connection { message: String },

  /// The database rejected or failed the query.
  #[error("query '{query}' failed: {message}")]
  Query { query: String, message: String },

  /// The external command could not be started.
  #[error("failed to spawn '{command}': {message}")]
  Spawn { command: String, message: String },
}

impl HostError {
  /// Create a query error.
  pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Query {
      query: query.into(),
      message: message.into(),
    }
  }

  /// Create a connection error.
  pub fn connection(message: impl Into<String>) -> Self {
    Self::Connection {
      message: message.into(),
    }
  }
}
