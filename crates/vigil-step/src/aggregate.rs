use vigil_audit::FindingReport;

use crate::StepResult;

/// Merge the findings of every successful step into one report.
///
/// The report is independent of the iteration order of `results_by_step`.
pub fn aggregate<'a, I>(results_by_step: I) -> FindingReport
where
  I: IntoIterator<Item = &'a StepResult>,
{
  FindingReport::from_findings(
    results_by_step
      .into_iter()
      .filter(|r| r.is_success())
      .flat_map(|r| r.payload.findings().iter().cloned()),
  )
}
