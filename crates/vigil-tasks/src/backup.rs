use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vigil_host::{CommandSpec, ProcessOutput, ProcessRunner};
use vigil_step::{StepContext, StepError, StepPayload, Task};

/// Run a command and turn a non-zero exit into a step error.
async fn run_checked(
  runner: &dyn ProcessRunner,
  command: &CommandSpec,
) -> Result<ProcessOutput, StepError> {
  let output = runner.run(command).await?;
  if !output.success() {
    return Err(StepError::CommandFailed {
      command: command.to_string(),
      exit_code: output.exit_code,
      stderr: output.stderr.trim().to_string(),
    });
  }
  Ok(output)
}

/// Single-quote a value for `sh -c`.
fn quote(value: impl AsRef<str>) -> String {
  format!("'{}'", value.as_ref().replace('\'', r"'\''"))
}

fn quote_path(path: &Path) -> String {
  quote(path.to_string_lossy())
}

fn artifact_name(ctx: &StepContext, extension: &str) -> String {
  format!("backup_{}.{}", ctx.now().format("%Y%m%d_%H%M%S"), extension)
}

/// `pg_dump` through a container, compressed with gzip.
pub struct PostgresBackupTask {
  runner: Arc<dyn ProcessRunner>,
  container: String,
  database: String,
  user: String,
  directory: PathBuf,
}

impl PostgresBackupTask {
  pub fn new(
    runner: Arc<dyn ProcessRunner>,
    container: impl Into<String>,
    database: impl Into<String>,
    user: impl Into<String>,
    directory: impl Into<PathBuf>,
  ) -> Self {
    Self {
      runner,
      container: container.into(),
      database: database.into(),
      user: user.into(),
      directory: directory.into(),
    }
  }
}

#[async_trait]
impl Task for PostgresBackupTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let dump = self.directory.join(artifact_name(ctx, "sql"));
    // Dump then compress, so a failing pg_dump fails the script.
    let script = format!(
      "mkdir -p {dir} && docker exec {container} pg_dump -U {user} {database} > {dump} && gzip -f {dump}",
      dir = quote_path(&self.directory),
      container = quote(&self.container),
      user = quote(&self.user),
      database = quote(&self.database),
      dump = quote_path(&dump),
    );
    run_checked(self.runner.as_ref(), &CommandSpec::shell(script)).await?;

    let path = format!("{}.gz", dump.display());
    info!(step = %ctx.step, path = %path, "postgres_backup_written");
    Ok(StepPayload::Backup { path })
  }
}

/// `mongodump` archive streamed out of a container.
pub struct MongoBackupTask {
  runner: Arc<dyn ProcessRunner>,
  container: String,
  database: String,
  directory: PathBuf,
}

impl MongoBackupTask {
  pub fn new(
    runner: Arc<dyn ProcessRunner>,
    container: impl Into<String>,
    database: impl Into<String>,
    directory: impl Into<PathBuf>,
  ) -> Self {
    Self {
      runner,
      container: container.into(),
      database: database.into(),
      directory: directory.into(),
    }
  }
}

#[async_trait]
impl Task for MongoBackupTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let archive = self.directory.join(artifact_name(ctx, "archive"));
    let script = format!(
      "mkdir -p {dir} && docker exec {container} mongodump --db={database} --archive --gzip > {archive}",
      dir = quote_path(&self.directory),
      container = quote(&self.container),
      database = quote(&self.database),
      archive = quote_path(&archive),
    );
    run_checked(self.runner.as_ref(), &CommandSpec::shell(script)).await?;

    let path = archive.display().to_string();
    info!(step = %ctx.step, path = %path, "mongo_backup_written");
    Ok(StepPayload::Backup { path })
  }
}

/// Deletes files matching `pattern` older than the retention period.
pub struct PruneBackupsTask {
  runner: Arc<dyn ProcessRunner>,
  directory: PathBuf,
  pattern: String,
  retention_days: u32,
}

impl PruneBackupsTask {
  pub fn new(
    runner: Arc<dyn ProcessRunner>,
    directory: impl Into<PathBuf>,
    pattern: impl Into<String>,
    retention_days: u32,
  ) -> Self {
    Self {
      runner,
      directory: directory.into(),
      pattern: pattern.into(),
      retention_days,
    }
  }

  fn command(&self) -> CommandSpec {
    CommandSpec::new("find")
      .arg(self.directory.to_string_lossy())
      .arg("-name")
      .arg(&self.pattern)
      .arg("-mtime")
      .arg(format!("+{}", self.retention_days))
      .arg("-print")
      .arg("-delete")
  }
}

#[async_trait]
impl Task for PruneBackupsTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let output = run_checked(self.runner.as_ref(), &self.command()).await?;
    let removed = output.stdout.lines().filter(|l| !l.is_empty()).count();
    info!(step = %ctx.step, directory = %self.directory.display(), removed, "backups_pruned");
    Ok(StepPayload::Command(output))
  }
}

/// Free space of the filesystem holding a directory, and the directory size.
pub struct DiskUsageTask {
  runner: Arc<dyn ProcessRunner>,
  directory: PathBuf,
}

impl DiskUsageTask {
  pub fn new(runner: Arc<dyn ProcessRunner>, directory: impl Into<PathBuf>) -> Self {
    Self {
      runner,
      directory: directory.into(),
    }
  }
}

#[async_trait]
impl Task for DiskUsageTask {
  async fn run(&self, _ctx: &StepContext) -> Result<StepPayload, StepError> {
    let dir = quote_path(&self.directory);
    let script = format!("df -h {dir} && du -sh {dir}", dir = dir);
    let output = run_checked(self.runner.as_ref(), &CommandSpec::shell(script)).await?;
    Ok(StepPayload::Command(output))
  }
}

/// An arbitrary command.
pub struct CommandTask {
  runner: Arc<dyn ProcessRunner>,
  command: CommandSpec,
}

impl CommandTask {
  pub fn new(runner: Arc<dyn ProcessRunner>, command: CommandSpec) -> Self {
    Self { runner, command }
  }
}

#[async_trait]
impl Task for CommandTask {
  async fn run(&self, _ctx: &StepContext) -> Result<StepPayload, StepError> {
    let output = run_checked(self.runner.as_ref(), &self.command).await?;
    Ok(StepPayload::Command(output))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_quote_escapes_single_quotes() {
    assert_eq!(quote("plain"), "'plain'");
    assert_eq!(quote("it's"), r"'it'\''s'");
  }

  #[test]
  fn test_prune_command() {
    struct Never;
    #[async_trait]
    impl ProcessRunner for Never {
      async fn run(&self, _command: &CommandSpec) -> Result<ProcessOutput, vigil_host::HostError> {
        unreachable!()
      }
    }

    let task = PruneBackupsTask::new(Arc::new(Never), "/backups/postgres", "backup_*.sql.gz", 7);
    assert_eq!(
      task.command().to_string(),
      "find /backups/postgres -name backup_*.sql.gz -mtime +7 -print -delete"
    );
  }
}
