//! Diagnostic Store
//!
//! Persists readings together with their classification, keyed to hardware.
//! Readings are append-only: there is no mutation or deletion path. A
//! reading and its classification land in one row, so a record either
//! persists completely or not at all.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::config::{Metric, ThresholdConfig};
use crate::db::StoreHandle;
use crate::error::{Error, Result};
use crate::evaluator::{self, IssueClassification};

/// One submitted set of metric values for one hardware unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReading {
    pub hardware_serial: String,
    pub temperature: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

impl DiagnosticReading {
    /// A reading taken now.
    pub fn new(
        serial: &str,
        temperature: f64,
        cpu_usage: f64,
        memory_usage: f64,
        technician: &str,
    ) -> Self {
        Self {
            hardware_serial: serial.to_string(),
            temperature,
            cpu_usage,
            memory_usage,
            recorded_by: technician.to_string(),
            recorded_at: Utc::now(),
        }
    }

    /// Observed value for one metric.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::CpuUsage => self.cpu_usage,
            Metric::MemoryUsage => self.memory_usage,
        }
    }
}

/// Store over the durable database. Classifies on ingest via the evaluator.
pub struct DiagnosticStore<'a> {
    db: &'a StoreHandle,
    config: &'a ThresholdConfig,
    audit: &'a AuditLog,
}

impl<'a> DiagnosticStore<'a> {
    pub fn new(db: &'a StoreHandle, config: &'a ThresholdConfig, audit: &'a AuditLog) -> Self {
        Self { db, config, audit }
    }

    /// Classify and persist a reading, returning the classification.
    ///
    /// Fails with [`Error::UnknownHardware`] if the serial is not
    /// registered; nothing is stored in that case.
    pub fn record(&self, reading: DiagnosticReading) -> Result<IssueClassification> {
        let technician = reading.recorded_by.clone();
        self.try_record(reading)
            .inspect_err(|e| self.audit.log_failure(&technician, "record diagnostic", e))
    }

    fn try_record(&self, reading: DiagnosticReading) -> Result<IssueClassification> {
        let registered: bool = self.db.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM hardware WHERE serial_number = ?1)",
            params![reading.hardware_serial],
            |row| row.get(0),
        )?;
        if !registered {
            return Err(Error::UnknownHardware(reading.hardware_serial));
        }

        let classification = evaluator::classify(&reading, self.config);
        let issues_json = serde_json::to_string(&classification)?;

        self.db.conn.execute(
            "INSERT INTO diagnostics
                (hardware_serial, temperature, cpu_usage, memory_usage, recorded_by, recorded_at, issues)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                reading.hardware_serial,
                reading.temperature,
                reading.cpu_usage,
                reading.memory_usage,
                reading.recorded_by,
                reading.recorded_at,
                issues_json,
            ],
        )?;

        info!(
            serial = %reading.hardware_serial,
            issues = classification.issues.len(),
            "recorded diagnostic"
        );
        self.audit.log(
            &AuditEntry::new(AuditAction::DiagnosticRecorded, &reading.recorded_by).with_details(
                serde_json::json!({
                    "serial": reading.hardware_serial,
                    "temperature": reading.temperature,
                    "cpu_usage": reading.cpu_usage,
                    "memory_usage": reading.memory_usage,
                    "issues": classification,
                }),
            ),
        )?;
        Ok(classification)
    }

    /// History for one hardware unit, oldest first. Every call re-queries,
    /// so the result is stable until a new reading lands in between.
    pub fn history(&self, serial: &str) -> Result<Vec<(DiagnosticReading, IssueClassification)>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT hardware_serial, temperature, cpu_usage, memory_usage,
                    recorded_by, recorded_at, issues
             FROM diagnostics WHERE hardware_serial = ?1
             ORDER BY recorded_at, id",
        )?;
        let rows = stmt.query_map(params![serial], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            let (reading, issues_json) = row?;
            entries.push((reading, serde_json::from_str(&issues_json)?));
        }
        Ok(entries)
    }

    /// Histories for every hardware serial that has readings, keyed by serial.
    pub fn history_all(
        &self,
    ) -> Result<BTreeMap<String, Vec<(DiagnosticReading, IssueClassification)>>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT hardware_serial, temperature, cpu_usage, memory_usage,
                    recorded_by, recorded_at, issues
             FROM diagnostics ORDER BY recorded_at, id",
        )?;
        let rows = stmt.query_map([], row_to_entry)?;
        let mut histories: BTreeMap<String, Vec<_>> = BTreeMap::new();
        for row in rows {
            let (reading, issues_json) = row?;
            let classification = serde_json::from_str(&issues_json)?;
            histories
                .entry(reading.hardware_serial.clone())
                .or_default()
                .push((reading, classification));
        }
        Ok(histories)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(DiagnosticReading, String)> {
    Ok((
        DiagnosticReading {
            hardware_serial: row.get(0)?,
            temperature: row.get(1)?,
            cpu_usage: row.get(2)?,
            memory_usage: row.get(3)?,
            recorded_by: row.get(4)?,
            recorded_at: row.get(5)?,
        },
        row.get(6)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bound;
    use crate::hardware::HardwareRegistry;

    struct Fixture {
        db: StoreHandle,
        config: ThresholdConfig,
        _dir: tempfile::TempDir,
        audit: AuditLog,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::open(dir.path().join("audit.jsonl"));
        let mut config = ThresholdConfig::default();
        config.thresholds.insert(Metric::Temperature, Bound { max: 80.0, min: None });
        Fixture {
            db: StoreHandle::open_in_memory().unwrap(),
            config,
            _dir: dir,
            audit,
        }
    }

    #[test]
    fn test_record_unknown_hardware_fails_and_stores_nothing() {
        let f = fixture();
        let store = DiagnosticStore::new(&f.db, &f.config, &f.audit);

        let err = store
            .record(DiagnosticReading::new("SN-404", 30.0, 50.0, 40.0, "alice"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownHardware(_)), "got {err:?}");
        assert!(store.history("SN-404").unwrap().is_empty());
    }

    #[test]
    fn test_record_returns_classification_and_persists() {
        let f = fixture();
        let registry = HardwareRegistry::new(&f.db, &f.config, &f.audit);
        let store = DiagnosticStore::new(&f.db, &f.config, &f.audit);
        registry.register("SN-1", "Server", "Rack 1A", "alice").unwrap();

        let classification = store
            .record(DiagnosticReading::new("SN-1", 95.0, 50.0, 40.0, "alice"))
            .unwrap();
        assert_eq!(classification.issues.len(), 1);
        assert_eq!(classification.issues[0].metric, Metric::Temperature);

        let history = store.history("SN-1").unwrap();
        assert_eq!(history.len(), 1);
        let (reading, stored) = &history[0];
        assert_eq!(reading.temperature, 95.0);
        assert_eq!(reading.recorded_by, "alice");
        assert_eq!(stored.issues.len(), 1);
        assert_eq!(stored.issues[0].threshold, 80.0);
    }

    #[test]
    fn test_history_is_ordered_and_restartable() {
        let f = fixture();
        let registry = HardwareRegistry::new(&f.db, &f.config, &f.audit);
        let store = DiagnosticStore::new(&f.db, &f.config, &f.audit);
        registry.register("SN-1", "Server", "Rack 1A", "alice").unwrap();

        for temp in [30.0, 95.0, 40.0] {
            store
                .record(DiagnosticReading::new("SN-1", temp, 50.0, 40.0, "alice"))
                .unwrap();
        }

        let first = store.history("SN-1").unwrap();
        let temps: Vec<f64> = first.iter().map(|(r, _)| r.temperature).collect();
        assert_eq!(temps, vec![30.0, 95.0, 40.0]);

        // Re-query yields the same set.
        let second = store.history("SN-1").unwrap();
        assert_eq!(second.len(), first.len());
    }

    #[test]
    fn test_history_all_groups_by_serial() {
        let f = fixture();
        let registry = HardwareRegistry::new(&f.db, &f.config, &f.audit);
        let store = DiagnosticStore::new(&f.db, &f.config, &f.audit);
        registry.register("SN-1", "Server", "Rack 1A", "alice").unwrap();
        registry.register("SN-2", "Switch", "Rack 2B", "alice").unwrap();

        store.record(DiagnosticReading::new("SN-1", 30.0, 50.0, 40.0, "alice")).unwrap();
        store.record(DiagnosticReading::new("SN-2", 95.0, 50.0, 40.0, "alice")).unwrap();
        store.record(DiagnosticReading::new("SN-1", 31.0, 50.0, 40.0, "alice")).unwrap();

        let all = store.history_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["SN-1"].len(), 2);
        assert_eq!(all["SN-2"].len(), 1);
    }
}
