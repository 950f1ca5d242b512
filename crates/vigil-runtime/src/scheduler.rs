//! Dependency-ordered step execution.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use vigil_host::{Clock, SystemClock};
use vigil_step::{SkipReason, StepExecutionError, StepResult, StepStatus};
use vigil_workflow::Workflow;

use crate::SchedulerConfig;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executor::StepExecution;
use crate::report::{RunReport, RunState, RunStatus};

/// Runs workflows.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use `Scheduler::new()` for a scheduler that discards events,
/// or `with_notifier()` to observe them.
pub struct Scheduler<N: ExecutionNotifier = NoopNotifier> {
  config: SchedulerConfig,
  clock: Arc<dyn Clock>,
  notifier: Arc<N>,
}

impl Scheduler<NoopNotifier> {
  pub fn new(config: SchedulerConfig) -> Self {
    Self {
      config,
      clock: Arc::new(SystemClock),
      notifier: Arc::new(NoopNotifier),
    }
  }
}

/// Bookkeeping for one run.
struct RunProgress {
  run_id: String,
  results: BTreeMap<String, StepResult>,
  /// Steps with a recorded terminal result.
  terminal: HashSet<String>,
  dispatched: HashSet<String>,
  /// Spawned task id -> step name and dispatch time.
  running: HashMap<Id, (String, DateTime<Utc>)>,
}

impl<N: ExecutionNotifier + 'static> Scheduler<N> {
  pub fn with_notifier<M: ExecutionNotifier>(self, notifier: M) -> Scheduler<M> {
    Scheduler {
      config: self.config,
      clock: self.clock,
      notifier: Arc::new(notifier),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn config(&self) -> &SchedulerConfig {
    &self.config
  }

  /// Execute every step of `workflow` and report the outcome.
  ///
  /// Cancelling `cancel` stops dispatching: steps already running finish,
  /// the rest are skipped with [`SkipReason::Cancelled`].
  #[instrument(
    name = "scheduler_run",
    skip(self, workflow, cancel),
    fields(workflow = %workflow.name())
  )]
  pub async fn run(&self, workflow: &Workflow, cancel: CancellationToken) -> RunReport {
    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = self.clock.now();

    info!(run_id = %run_id, steps = workflow.steps().len(), "run_started");
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
      workflow: workflow.name().to_string(),
    });

    let mut state = RunProgress {
      run_id: run_id.clone(),
      results: BTreeMap::new(),
      terminal: HashSet::new(),
      dispatched: HashSet::new(),
      running: HashMap::new(),
    };
    let mut tasks: JoinSet<StepResult> = JoinSet::new();

    loop {
      if !cancel.is_cancelled() {
        self.dispatch_ready(workflow, &mut state, &mut tasks);
      }

      let Some(joined) = tasks.join_next_with_id().await else {
        break;
      };

      let result = match joined {
        Ok((id, result)) => {
          state.running.remove(&id);
          result
        }
        Err(join_error) => {
          let Some((step, dispatched_at)) = state.running.remove(&join_error.id()) else {
            error!(run_id = %run_id, error = %join_error, "untracked_task_failed");
            continue;
          };
          let error = StepExecutionError {
            step,
            cause: format!("task join error: {}", join_error),
          };
          StepResult::failed(error, 1, dispatched_at, self.clock.now())
        }
      };

      self.record(workflow, &mut state, result);
    }

    let mut run_state = RunState::Completed;
    for step in workflow.steps() {
      if state.results.contains_key(&step.name) {
        continue;
      }
      run_state = RunState::Aborted;
      let result = StepResult::skipped(&step.name, SkipReason::Cancelled, self.clock.now());
      self.record(workflow, &mut state, result);
    }
    if run_state == RunState::Aborted {
      warn!(run_id = %run_id, "run_cancelled");
    }

    let status = RunStatus::evaluate(workflow, &state.results);
    info!(run_id = %run_id, status = ?status, state = ?run_state, "run_finished");
    self.notifier.notify(ExecutionEvent::RunFinished {
      run_id: run_id.clone(),
      status,
    });

    RunReport {
      run_id,
      workflow: workflow.name().to_string(),
      status,
      state: run_state,
      results: state.results,
      started_at,
      finished_at: self.clock.now(),
    }
  }

  /// Spawn every ready, not yet dispatched step, up to the concurrency limit.
  fn dispatch_ready(
    &self,
    workflow: &Workflow,
    state: &mut RunProgress,
    tasks: &mut JoinSet<StepResult>,
  ) {
    let graph = workflow.graph();
    let ready: Vec<String> = graph
      .ready(&state.terminal)
      .into_iter()
      .filter(|name| !state.dispatched.contains(*name))
      .map(str::to_string)
      .collect();

    for name in ready {
      if self
        .config
        .max_concurrency
        .is_some_and(|limit| tasks.len() >= limit)
      {
        break;
      }
      let Some(step) = workflow.step(&name) else {
        continue;
      };

      let upstream: HashMap<String, StepResult> = graph
        .ancestors(&name)
        .into_iter()
        .filter_map(|a| state.results.get(&a).cloned().map(|r| (a, r)))
        .collect();

      let execution = StepExecution {
        run_id: state.run_id.clone(),
        step: name.clone(),
        task: step.task.clone(),
        policy: step.retry.unwrap_or(self.config.default_retry),
        upstream: Arc::new(upstream),
        clock: self.clock.clone(),
        notifier: self.notifier.clone(),
      };

      info!(run_id = %state.run_id, step = %name, "step_started");
      self.notifier.notify(ExecutionEvent::StepStarted {
        run_id: state.run_id.clone(),
        step: name.clone(),
      });

      let handle = tasks.spawn(execution.run());
      state.dispatched.insert(name.clone());
      state.running.insert(handle.id(), (name, self.clock.now()));
    }
  }

  /// Store a terminal result and block descendants of failed critical steps.
  fn record(&self, workflow: &Workflow, state: &mut RunProgress, result: StepResult) {
    let name = result.step.clone();
    let run_id = state.run_id.clone();

    match result.status {
      StepStatus::Success => {
        info!(run_id = %run_id, step = %name, attempts = result.attempts, "step_succeeded");
        self.notifier.notify(ExecutionEvent::StepSucceeded {
          run_id: run_id.clone(),
          step: name.clone(),
          attempts: result.attempts,
        });
      }
      StepStatus::Failed => {
        let message = result
          .error
          .as_ref()
          .map(|e| e.cause.clone())
          .unwrap_or_default();
        error!(run_id = %run_id, step = %name, error = %message, "step_failed");
        self.notifier.notify(ExecutionEvent::StepFailed {
          run_id: run_id.clone(),
          step: name.clone(),
          error: message,
        });
      }
      StepStatus::Skipped => {
        let reason = result.skip_reason.clone().unwrap_or(SkipReason::Cancelled);
        info!(run_id = %run_id, step = %name, reason = ?reason, "step_skipped");
        self.notifier.notify(ExecutionEvent::StepSkipped {
          run_id: run_id.clone(),
          step: name.clone(),
          reason,
        });
      }
    }

    let blocks = result.status == StepStatus::Failed
      && workflow.step(&name).is_some_and(|s| s.critical);

    state.terminal.insert(name.clone());
    state.results.insert(name.clone(), result);

    if !blocks {
      return;
    }

    let descendants = workflow.graph().descendants(&name);
    let blocked: Vec<String> = workflow
      .graph()
      .names()
      .iter()
      .filter(|n| descendants.contains(*n) && !state.results.contains_key(*n))
      .cloned()
      .collect();
    for step in blocked {
      let skipped = StepResult::skipped(
        &step,
        SkipReason::BlockedBy { step: name.clone() },
        self.clock.now(),
      );
      self.record(workflow, state, skipped);
    }
  }
}
