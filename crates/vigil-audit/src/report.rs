use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Finding, FindingCode, Severity};

/// Findings of one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSection {
  pub code: FindingCode,
  pub count: usize,
  pub max_severity: Severity,
  pub findings: Vec<Finding>,
}

/// Findings merged across evaluators and steps, grouped by code.
///
/// Sections follow [`FindingCode`] declaration order and only codes with at
/// least one finding are present. Findings inside a section are sorted, so
/// the report does not depend on the order findings were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingReport {
  pub sections: Vec<FindingSection>,
  pub total: usize,
  pub any_critical: bool,
}

impl FindingReport {
  pub fn from_findings<I>(findings: I) -> Self
  where
    I: IntoIterator<Item = Finding>,
  {
    let mut grouped: BTreeMap<FindingCode, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
      grouped.entry(finding.code).or_default().push(finding);
    }

    let sections: Vec<FindingSection> = grouped
      .into_iter()
      .map(|(code, mut findings)| {
        findings.sort();
        let max_severity = findings
          .iter()
          .map(|f| f.severity)
          .max()
          .unwrap_or_default();
        FindingSection {
          code,
          count: findings.len(),
          max_severity,
          findings,
        }
      })
      .collect();

    let total = sections.iter().map(|s| s.count).sum();
    Self {
      any_critical: !sections.is_empty(),
      sections,
      total,
    }
  }

  pub fn section(&self, code: FindingCode) -> Option<&FindingSection> {
    self.sections.iter().find(|s| s.code == code)
  }

  /// Number of findings with the given code, zero when absent.
  pub fn count(&self, code: FindingCode) -> usize {
    self.section(code).map(|s| s.count).unwrap_or(0)
  }

  pub fn codes(&self) -> impl Iterator<Item = FindingCode> + '_ {
    self.sections.iter().map(|s| s.code)
  }

  pub fn is_empty(&self) -> bool {
    self.sections.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Subject;

  fn finding(code: FindingCode, subject: &str, count: u64) -> Finding {
    Finding::new(code, Subject::User(subject.to_string()), count, 1)
  }

  #[test]
  fn test_empty_report_is_not_critical() {
    let report = FindingReport::from_findings(Vec::new());
    assert!(report.is_empty());
    assert!(!report.any_critical);
    assert_eq!(report.total, 0);
    assert_eq!(report.count(FindingCode::InactiveUser), 0);
  }

  #[test]
  fn test_sections_follow_code_declaration_order() {
    let findings = vec![
      finding(FindingCode::InactiveUser, "u9", 100),
      finding(FindingCode::EmptyGroups, "g1", 0),
      finding(FindingCode::MultipleFailedLogins, "u1", 3),
      finding(FindingCode::InactiveUser, "u2", 95),
    ];

    let report = FindingReport::from_findings(findings.clone());
    let reversed = FindingReport::from_findings(findings.into_iter().rev());

    assert_eq!(report, reversed);
    assert_eq!(
      report.codes().collect::<Vec<_>>(),
      vec![
        FindingCode::MultipleFailedLogins,
        FindingCode::EmptyGroups,
        FindingCode::InactiveUser
      ]
    );
    assert_eq!(report.count(FindingCode::InactiveUser), 2);
    assert_eq!(report.total, 4);
    assert!(report.any_critical);
  }

  #[test]
  fn test_section_tracks_max_severity() {
    let report = FindingReport::from_findings(vec![
      finding(FindingCode::OffHoursAdminAction, "a", 1),
      finding(FindingCode::OffHoursAdminAction, "b", 4),
    ]);

    let section = report.section(FindingCode::OffHoursAdminAction).unwrap();
    assert_eq!(section.max_severity, Severity::High);
  }
}
