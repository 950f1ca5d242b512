use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{StepContext, StepError, StepPayload};

/// A unit of work bound to a step.
///
/// The scheduler may invoke `run` several times for one step when retries are
/// configured, so implementations must tolerate re-invocation.
#[async_trait]
pub trait Task: Send + Sync {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError>;
}

/// Adapter turning an async closure into a [`Task`].
pub struct FnTask<F>(F);

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
  F: Fn(StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<StepPayload, StepError>> + Send,
{
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    (self.0)(ctx.clone()).await
  }
}

pub fn task_fn<F, Fut>(f: F) -> Arc<dyn Task>
where
  F: Fn(StepContext) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<StepPayload, StepError>> + Send + 'static,
{
  Arc::new(FnTask(f))
}
