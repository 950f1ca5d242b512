//! Process invocation capability.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HostError;

/// A command to run: a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  /// A script run through `sh -c`, for pipelines and redirections.
  pub fn shell(script: impl Into<String>) -> Self {
    Self::new("sh").arg("-c").arg(script)
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
  pub exit_code: i32,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.exit_code == 0
  }
}

/// Runs external commands (backups, pruning, disk checks).
///
/// A non-zero exit code is reported through [`ProcessOutput`], not as an
/// error; the calling step decides that it failed.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
  async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, HostError>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
  async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, HostError> {
    debug!(command = %command, "spawning process");

    let output = tokio::process::Command::new(&command.program)
      .args(&command.args)
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|e| HostError::Spawn {
        command: command.to_string(),
        message: e.to_string(),
      })?;

    Ok(ProcessOutput {
      // Killed by a signal: no exit code.
      exit_code: output.status.code().unwrap_or(-1),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}
