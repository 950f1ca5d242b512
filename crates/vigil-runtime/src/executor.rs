//! Attempt loop for a single step.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};
use vigil_host::Clock;
use vigil_step::{StepContext, StepError, StepExecutionError, StepResult, Task};
use vigil_workflow::RetryPolicy;

use crate::events::{ExecutionEvent, ExecutionNotifier};

/// Everything a spawned step needs, detached from the scheduler.
pub(crate) struct StepExecution<N> {
  pub run_id: String,
  pub step: String,
  pub task: Arc<dyn Task>,
  pub policy: RetryPolicy,
  pub upstream: Arc<HashMap<String, StepResult>>,
  pub clock: Arc<dyn Clock>,
  pub notifier: Arc<N>,
}

impl<N: ExecutionNotifier> StepExecution<N> {
  /// Invoke the task until it succeeds or the retry budget is spent.
  ///
  /// Errors and panics raised by the task are captured into the result,
  /// whose timestamps cover the last attempt only.
  pub async fn run(self) -> StepResult {
    let max_attempts = self.policy.max_attempts();
    let mut attempt = 1;

    loop {
      let started_at = self.clock.now();
      let ctx = StepContext {
        run_id: self.run_id.clone(),
        step: self.step.clone(),
        attempt,
        upstream: self.upstream.clone(),
        clock: self.clock.clone(),
      };

      let outcome = AssertUnwindSafe(self.task.run(&ctx)).catch_unwind().await;
      let error = match outcome {
        Ok(Ok(payload)) => {
          return StepResult::success(&self.step, payload, attempt, started_at, self.clock.now());
        }
        Ok(Err(e)) => e,
        Err(panic) => StepError::Panicked {
          message: panic_message(panic.as_ref()),
        },
      };

      if attempt >= max_attempts {
        info!(step = %self.step, attempts = attempt, error = %error, "step_attempts_exhausted");
        let error = StepExecutionError::new(&self.step, &error);
        return StepResult::failed(error, attempt, started_at, self.clock.now());
      }

      let delay = self.policy.delay_for(attempt);
      let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
      warn!(
        run_id = %self.run_id,
        step = %self.step,
        attempt,
        delay_ms,
        error = %error,
        "step_retrying"
      );
      self.notifier.notify(ExecutionEvent::StepRetrying {
        run_id: self.run_id.clone(),
        step: self.step.clone(),
        attempt,
        delay_ms,
        error: error.to_string(),
      });

      self.clock.sleep(delay).await;
      attempt += 1;
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
