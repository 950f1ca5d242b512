use async_trait::async_trait;
use tracing::info;
use vigil_step::{StepContext, StepError, StepPayload, Task, aggregate};

/// Merges the findings of every upstream step into one report.
#[derive(Debug, Default)]
pub struct FindingsReportTask;

#[async_trait]
impl Task for FindingsReportTask {
  async fn run(&self, ctx: &StepContext) -> Result<StepPayload, StepError> {
    let report = aggregate(ctx.upstream.values());
    info!(
      step = %ctx.step,
      total = report.total,
      any_critical = report.any_critical,
      "findings_aggregated"
    );
    Ok(StepPayload::Report(report))
  }
}
