//! Report Generator
//!
//! Aggregates stored readings for one or all hardware units into a
//! structured summary. Read-only: the only side effect is the compliance
//! audit event noting that a report was produced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::config::{Metric, ThresholdConfig};
use crate::db::StoreHandle;
use crate::error::{Error, Result};
use crate::evaluator::{IssueClassification, Severity};
use crate::hardware::HardwareRegistry;
use crate::store::{DiagnosticReading, DiagnosticStore};

/// Which hardware a report or escalation scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Hardware(String),
    All,
}

impl Scope {
    pub fn describe(&self) -> String {
        match self {
            Scope::Hardware(serial) => serial.clone(),
            Scope::All => "all hardware".to_string(),
        }
    }
}

/// Issue counts split by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub warning: u64,
    pub critical: u64,
}

impl SeverityCounts {
    pub fn total(&self) -> u64 {
        self.warning + self.critical
    }

    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Warning => self.warning += 1,
            Severity::Critical => self.critical += 1,
        }
    }
}

/// Per-unit coverage line in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareSummary {
    pub serial_number: String,
    pub hardware_type: String,
    pub location: String,
    pub total_readings: u64,
    pub issues_by_severity: SeverityCounts,
}

/// One stored reading whose classification was non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedReading {
    pub hardware_serial: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    pub classification: IssueClassification,
}

/// Aggregated diagnostic report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Hardware covered, in registration order.
    pub hardware: Vec<HardwareSummary>,
    pub total_readings: u64,
    pub issues_by_severity: SeverityCounts,
    /// Breach counts per metric.
    pub issues_by_metric: BTreeMap<Metric, u64>,
    /// Latest reading in scope, if any.
    pub most_recent_reading: Option<DiagnosticReading>,
    /// Every non-empty classification with its reading timestamp,
    /// oldest first.
    pub flagged: Vec<FlaggedReading>,
}

/// Generator over the durable store.
pub struct ReportGenerator<'a> {
    db: &'a StoreHandle,
    config: &'a ThresholdConfig,
    audit: &'a AuditLog,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(db: &'a StoreHandle, config: &'a ThresholdConfig, audit: &'a AuditLog) -> Self {
        Self { db, config, audit }
    }

    /// Build a report for one hardware unit or the whole registry.
    ///
    /// Hardware with zero readings yields zero counts, not an error. A
    /// specific serial that is not registered fails with
    /// [`Error::UnknownHardware`].
    pub fn generate(&self, scope: &Scope, technician: &str) -> Result<Report> {
        self.try_generate(scope)
            .inspect_err(|e| self.audit.log_failure(technician, "generate report", e))
            .and_then(|report| {
                self.audit.log(
                    &AuditEntry::new(AuditAction::ReportGenerated, technician).with_details(
                        serde_json::json!({
                            "scope": scope.describe(),
                            "total_readings": report.total_readings,
                            "issues": report.issues_by_severity.total(),
                        }),
                    ),
                )?;
                Ok(report)
            })
    }

    fn try_generate(&self, scope: &Scope) -> Result<Report> {
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

        let mut report = Report {
            hardware: Vec::with_capacity(units.len()),
            total_readings: 0,
            issues_by_severity: SeverityCounts::default(),
            issues_by_metric: Metric::ALL.iter().map(|m| (*m, 0)).collect(),
            most_recent_reading: None,
            flagged: Vec::new(),
        };

        for unit in units {
            let history = store.history(&unit.serial_number)?;
            let mut unit_counts = SeverityCounts::default();

            for (reading, classification) in &history {
                for issue in &classification.issues {
                    unit_counts.add(issue.severity);
                    report.issues_by_severity.add(issue.severity);
                    *report.issues_by_metric.entry(issue.metric).or_default() += 1;
                }
                if !classification.is_empty() {
                    report.flagged.push(FlaggedReading {
                        hardware_serial: reading.hardware_serial.clone(),
                        recorded_at: reading.recorded_at,
                        classification: classification.clone(),
                    });
                }
                let newer = report
                    .most_recent_reading
                    .as_ref()
                    .map(|latest| reading.recorded_at >= latest.recorded_at)
                    .unwrap_or(true);
                if newer {
                    report.most_recent_reading = Some(reading.clone());
                }
            }

            report.total_readings += history.len() as u64;
            report.hardware.push(HardwareSummary {
                serial_number: unit.serial_number,
                hardware_type: unit.hardware_type,
                location: unit.location,
                total_readings: history.len() as u64,
                issues_by_severity: unit_counts,
            });
        }

        report
            .flagged
            .sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(report)
    }
}
