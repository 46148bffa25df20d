//! Diagnostic Evaluator
//!
//! Pure classification of one reading against the threshold configuration.
//! No side effects and no hidden state: identical inputs always produce the
//! identical issue set, which is what makes classifications reproducible
//! from the audit trail.

use serde::{Deserialize, Serialize};

use crate::config::{Metric, SeverityPolicy, ThresholdConfig};
use crate::store::DiagnosticReading;

/// Issue severity. Ordering matters: `Critical > Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// One threshold breach: which metric, what was observed, which bound it
/// broke, and how severe the deviation is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub metric: Metric,
    pub observed: f64,
    pub threshold: f64,
    pub severity: Severity,
}

/// The full classification of one reading. Empty means no issue detected.
/// Issues appear in canonical metric order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueClassification {
    pub issues: Vec<Issue>,
}

impl IssueClassification {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    pub fn issue_for(&self, metric: Metric) -> Option<&Issue> {
        self.issues.iter().find(|i| i.metric == metric)
    }
}

/// Classify a reading against the configured bounds.
///
/// A metric breaches when it exceeds its `max`, or falls below its `min`
/// where one is defined. Severity comes from the deviation relative to the
/// breached bound via [`SeverityPolicy`].
pub fn classify(reading: &DiagnosticReading, config: &ThresholdConfig) -> IssueClassification {
    let mut issues = Vec::new();

    for metric in Metric::ALL {
        let Some(bound) = config.threshold_for(metric) else {
            continue;
        };
        let observed = reading.value(metric);

        if observed > bound.max {
            issues.push(Issue {
                metric,
                observed,
                threshold: bound.max,
                severity: severity_for(observed, bound.max, &config.severity),
            });
        } else if let Some(min) = bound.min {
            if observed < min {
                issues.push(Issue {
                    metric,
                    observed,
                    threshold: min,
                    severity: severity_for(observed, min, &config.severity),
                });
            }
        }
    }

    IssueClassification { issues }
}

/// Severity band for a breach of `bound` by `observed`.
///
/// Deviation within `critical_over_pct` percent of the bound (inclusive) is
/// a Warning; beyond it, Critical. A zero bound has no meaningful relative
/// deviation, so any breach of it is Critical.
fn severity_for(observed: f64, bound: f64, policy: &SeverityPolicy) -> Severity {
    if bound <= 0.0 {
        return Severity::Critical;
    }
    let deviation_pct = (observed - bound).abs() / bound * 100.0;
    if deviation_pct > policy.critical_over_pct {
        Severity::Critical
    } else {
        Severity::Warning
    }
}
