//! Escalation Advisor
//!
//! Scans stored history and decides which issues warrant routing beyond
//! normal technician handling. Decisions derive solely from the store; the
//! advisor keeps no state of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::debug;

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::config::{Metric, ThresholdConfig};
use crate::db::StoreHandle;
use crate::error::{Error, Result};
use crate::evaluator::Severity;
use crate::hardware::HardwareRegistry;
use crate::report::Scope;
use crate::store::DiagnosticStore;

/// What triggers an escalation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Minimum severity that escalates on its own.
    pub min_severity: Severity,
    /// A metric breaching in this many consecutive readings escalates even
    /// when every individual breach stayed below `min_severity`.
    pub repeat_threshold: usize,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            min_severity: Severity::Warning,
            repeat_threshold: 3,
        }
    }
}

/// One escalation recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationSuggestion {
    pub hardware_serial: String,
    pub hardware_type: String,
    pub location: String,
    pub metric: Metric,
    pub severity: Severity,
    pub reason: String,
    pub recommended_action: String,
    /// Timestamp of the most recent breach backing this suggestion.
    pub last_seen: DateTime<Utc>,
}

/// Advisor over the durable store.
pub struct EscalationAdvisor<'a> {
    db: &'a StoreHandle,
    config: &'a ThresholdConfig,
    audit: &'a AuditLog,
}

impl<'a> EscalationAdvisor<'a> {
    pub fn new(db: &'a StoreHandle, config: &'a ThresholdConfig, audit: &'a AuditLog) -> Self {
        Self { db, config, audit }
    }

    /// Derive escalation suggestions for the scope under `policy`.
    ///
    /// At most one suggestion per (hardware, metric). Ordered most severe
    /// first, then most recent; ties break by serial, then metric, so two
    /// runs over the same history produce the same sequence.
    pub fn suggest(
        &self,
        scope: &Scope,
        policy: &EscalationPolicy,
        technician: &str,
    ) -> Result<Vec<EscalationSuggestion>> {
        self.try_suggest(scope, policy)
            .inspect_err(|e| self.audit.log_failure(technician, "suggest escalations", e))
            .and_then(|suggestions| {
                self.audit.log(
                    &AuditEntry::new(AuditAction::EscalationSuggested, technician).with_details(
                        serde_json::json!({
                            "scope": scope.describe(),
                            "count": suggestions.len(),
                            "suggestions": suggestions,
                        }),
                    ),
                )?;
                Ok(suggestions)
            })
    }

    fn try_suggest(
        &self,
        scope: &Scope,
        policy: &EscalationPolicy,
    ) -> Result<Vec<EscalationSuggestion>> {
        let registry = HardwareRegistry::new(self.db, self.config, self.audit);
        let store = DiagnosticStore::new(self.db, self.config, self.audit);

        let units = match scope {
            Scope::Hardware(serial) => {
                let record = registry
                    .lookup(serial)?
                    .ok_or_else(|| Error::UnknownHardware(serial.clone()))?;
                vec![record]
            }
            Scope::All => registry.list_all()?,
        };

        let mut suggestions = Vec::new();
        for unit in &units {
            let history = store.history(&unit.serial_number)?;
            for metric in Metric::ALL {
                if let Some(s) = evaluate_metric(unit, metric, &history, policy) {
                    suggestions.push(s);
                }
            }
        }

        suggestions.sort_by(|a, b| {
            (Reverse(a.severity), Reverse(a.last_seen), &a.hardware_serial, a.metric)
                .cmp(&(Reverse(b.severity), Reverse(b.last_seen), &b.hardware_serial, b.metric))
        });
        debug!(count = suggestions.len(), scope = %scope.describe(), "escalation scan complete");
        Ok(suggestions)
    }
}

/// Walk one metric through a unit's history and decide whether it escalates.
fn evaluate_metric(
    unit: &crate::hardware::HardwareRecord,
    metric: Metric,
    history: &[(crate::store::DiagnosticReading, crate::evaluator::IssueClassification)],
    policy: &EscalationPolicy,
) -> Option<EscalationSuggestion> {
    let mut current_run = 0usize;
    let mut longest_run = 0usize;
    let mut worst: Option<crate::evaluator::Issue> = None;
    let mut last_seen: Option<DateTime<Utc>> = None;

    for (reading, classification) in history {
        match classification.issue_for(metric) {
            Some(issue) => {
                current_run += 1;
                longest_run = longest_run.max(current_run);
                last_seen = Some(reading.recorded_at);
                let is_worse = worst
                    .as_ref()
                    .map(|w| issue.severity >= w.severity)
                    .unwrap_or(true);
                if is_worse {
                    worst = Some(issue.clone());
                }
            }
            None => current_run = 0,
        }
    }

    let worst = worst?;
    let last_seen = last_seen?;

    let severity_triggered = worst.severity >= policy.min_severity;
    let repeat_triggered = policy.repeat_threshold > 0 && longest_run >= policy.repeat_threshold;
    if !severity_triggered && !repeat_triggered {
        return None;
    }

    let base = format!(
        "{} reached {:.1} against limit {:.1} ({})",
        metric, worst.observed, worst.threshold, worst.severity
    );
    let reason = if repeat_triggered {
        format!("{base}; breached in {longest_run} consecutive readings")
    } else {
        base
    };

    Some(EscalationSuggestion {
        hardware_serial: unit.serial_number.clone(),
        hardware_type: unit.hardware_type.clone(),
        location: unit.location.clone(),
        metric,
        severity: worst.severity,
        reason,
        recommended_action: recommended_action(metric).to_string(),
        last_seen,
    })
}

fn recommended_action(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "Inspect cooling, airflow and ambient conditions at the unit's location",
        Metric::CpuUsage => "Review workload placement and check for runaway processes",
        Metric::MemoryUsage => "Check for memory leaks and rebalance or add capacity",
    }
}
