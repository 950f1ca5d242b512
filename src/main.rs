use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vigil_config::WorkflowDef;
use vigil_host::{PgQueryExecutor, QueryExecutor, StaticQueryExecutor, TokioProcessRunner};
use vigil_resolver::{Resolver, StandardResolver};
use vigil_runtime::{RunStatus, Scheduler, SchedulerConfig};
use vigil_workflow::Workflow;

/// Vigil - maintenance and audit workflows as dependency graphs of steps
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Directory relative backup paths are resolved against (default: ~/.vigil/backups)
  #[arg(long, global = true)]
  backup_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow and print its report as JSON
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// PostgreSQL connection string
    #[arg(long, env = "VIGIL_DATABASE_URL")]
    database_url: Option<String>,

    /// JSON file mapping query names to rows, used instead of a database
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Maximum number of steps running at once
    #[arg(long)]
    concurrency: Option<usize>,
  },

  /// Check a workflow file without running it
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Print the steps of a workflow grouped by dependency layer
  Plan {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },
}

fn main() -> Result<ExitCode> {
  init_tracing();
  let Cli {
    backup_dir,
    command,
  } = Cli::parse();

  let backup_dir = match backup_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".vigil")
      .join("backups"),
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(dispatch(command, backup_dir))
}

async fn dispatch(command: Commands, backup_dir: PathBuf) -> Result<ExitCode> {
  match command {
    Commands::Run {
      workflow_file,
      database_url,
      fixtures,
      concurrency,
    } => {
      let db = connect(database_url, fixtures, concurrency).await?;
      run_workflow(&workflow_file, db, backup_dir, concurrency).await
    }
    Commands::Validate { workflow_file } => {
      let workflow = resolve_offline(&workflow_file, backup_dir).await?;
      println!(
        "{}: {} steps, no errors",
        workflow.name(),
        workflow.steps().len()
      );
      Ok(ExitCode::SUCCESS)
    }
    Commands::Plan { workflow_file } => {
      let workflow = resolve_offline(&workflow_file, backup_dir).await?;
      print_plan(&workflow);
      Ok(ExitCode::SUCCESS)
    }
  }
}

fn init_tracing() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();
}

async fn load_workflow(workflow_file: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))
}

async fn connect(
  database_url: Option<String>,
  fixtures: Option<PathBuf>,
  concurrency: Option<usize>,
) -> Result<Arc<dyn QueryExecutor>> {
  if let Some(path) = fixtures {
    let content = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read fixtures file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
      .with_context(|| format!("failed to parse fixtures file: {}", path.display()))?;
    let db = StaticQueryExecutor::from_json(value)
      .with_context(|| format!("invalid fixtures in {}", path.display()))?;
    info!(path = %path.display(), "using_fixtures");
    return Ok(Arc::new(db));
  }

  let Some(url) = database_url else {
    bail!("either --database-url (or VIGIL_DATABASE_URL) or --fixtures is required");
  };
  let max_connections = concurrency.unwrap_or(5).clamp(1, 32) as u32;
  let db = PgQueryExecutor::connect(&url, max_connections)
    .await
    .context("failed to connect to the database")?;
  Ok(Arc::new(db))
}

/// Resolve without touching a database: nothing runs, so no data source is needed.
async fn resolve_offline(workflow_file: &Path, backup_dir: PathBuf) -> Result<Workflow> {
  let def = load_workflow(workflow_file).await?;
  let resolver = StandardResolver::new(
    Arc::new(StaticQueryExecutor::new()),
    Arc::new(TokioProcessRunner),
    backup_dir,
  );
  resolver
    .resolve(def)
    .await
    .with_context(|| format!("invalid workflow: {}", workflow_file.display()))
}

async fn run_workflow(
  workflow_file: &Path,
  db: Arc<dyn QueryExecutor>,
  backup_dir: PathBuf,
  concurrency: Option<usize>,
) -> Result<ExitCode> {
  let def = load_workflow(workflow_file).await?;
  let mut config = SchedulerConfig::default();
  if let Some(limit) = concurrency.or(def.max_concurrency) {
    config = config.with_max_concurrency(limit);
  }

  let resolver = StandardResolver::new(db, Arc::new(TokioProcessRunner), backup_dir);
  let workflow = resolver
    .resolve(def)
    .await
    .context("failed to resolve workflow")?;

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt_received");
      on_interrupt.cancel();
    }
  });

  let report = Scheduler::new(config).run(&workflow, cancel).await;

  println!("{}", serde_json::to_string_pretty(&report)?);

  Ok(match report.status {
    RunStatus::Success => ExitCode::SUCCESS,
    RunStatus::Failed => ExitCode::from(1),
    RunStatus::PartialFailure => ExitCode::from(2),
  })
}

fn print_plan(workflow: &Workflow) {
  println!("{}", workflow.name());
  for (index, layer) in workflow.graph().layers().into_iter().enumerate() {
    let steps: Vec<String> = layer
      .into_iter()
      .map(|name| match workflow.step(name) {
        Some(step) if step.critical => format!("{} (critical)", name),
        _ => name.to_string(),
      })
      .collect();
    println!("  {}: {}", index + 1, steps.join(", "));
  }
}
