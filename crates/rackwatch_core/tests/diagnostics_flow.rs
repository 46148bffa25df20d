//! End-to-end flow over a real on-disk database: register hardware, record
//! readings, generate reports, derive escalations, and verify the audit
//! trail that falls out of it.

use rackwatch_core::{
    AuditLog, DiagnosticReading, DiagnosticStore, EscalationAdvisor, EscalationPolicy,
    HardwareRegistry, Metric, ReportGenerator, Scope, Severity, StoreHandle, ThresholdConfig,
};

struct World {
    db: StoreHandle,
    config: ThresholdConfig,
    audit: AuditLog,
    audit_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn world() -> World {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        r#"{
            "hardware_types": ["Server", "Switch", "Storage", "Disk"],
            "thresholds": {
                "temperature": { "max": 80.0 },
                "cpu_usage": { "max": 90.0 },
                "memory_usage": { "max": 85.0 }
            }
        }"#,
    )
    .unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    World {
        db: StoreHandle::open_at(dir.path().join("rackwatch.db")).unwrap(),
        config: ThresholdConfig::load(&config_path).unwrap(),
        audit: AuditLog::open(&audit_path),
        audit_path,
        _dir: dir,
    }
}

#[test]
fn full_diagnostic_cycle() {
    let w = world();
    let registry = HardwareRegistry::new(&w.db, &w.config, &w.audit);
    let store = DiagnosticStore::new(&w.db, &w.config, &w.audit);
    let reports = ReportGenerator::new(&w.db, &w.config, &w.audit);
    let advisor = EscalationAdvisor::new(&w.db, &w.config, &w.audit);

    registry.register("WEB-01", "Server", "Rack 1A", "alice").unwrap();
    registry.register("SW-07", "Switch", "Rack 4C", "bob").unwrap();

    // Clean reading, then an overheating streak on WEB-01.
    store
        .record(DiagnosticReading::new("WEB-01", 35.0, 50.0, 40.0, "alice"))
        .unwrap();
    store
        .record(DiagnosticReading::new("WEB-01", 99.0, 50.0, 40.0, "alice"))
        .unwrap();
    store
        .record(DiagnosticReading::new("WEB-01", 101.0, 55.0, 40.0, "alice"))
        .unwrap();
    // Mild CPU pressure on SW-07.
    store
        .record(DiagnosticReading::new("SW-07", 30.0, 95.0, 40.0, "bob"))
        .unwrap();

    let report = reports.generate(&Scope::All, "alice").unwrap();
    assert_eq!(report.total_readings, 4);
    assert_eq!(report.issues_by_severity.critical, 2);
    assert_eq!(report.issues_by_severity.warning, 1);
    assert_eq!(report.issues_by_metric[&Metric::Temperature], 2);
    assert_eq!(report.issues_by_metric[&Metric::CpuUsage], 1);
    assert_eq!(report.flagged.len(), 3);
    assert_eq!(
        report.most_recent_reading.as_ref().unwrap().hardware_serial,
        "SW-07"
    );

    let suggestions = advisor
        .suggest(&Scope::All, &EscalationPolicy::default(), "alice")
        .unwrap();
    assert_eq!(suggestions.len(), 2);
    // The critical overheating streak outranks the single CPU warning.
    assert_eq!(suggestions[0].hardware_serial, "WEB-01");
    assert_eq!(suggestions[0].metric, Metric::Temperature);
    assert_eq!(suggestions[0].severity, Severity::Critical);
    assert_eq!(suggestions[0].hardware_type, "Server");
    assert_eq!(suggestions[0].location, "Rack 1A");
    assert_eq!(suggestions[1].hardware_serial, "SW-07");
    assert_eq!(suggestions[1].metric, Metric::CpuUsage);

    // Audit trail carries one event per action, in order.
    let content = std::fs::read_to_string(&w.audit_path).unwrap();
    let actions: Vec<String> = content
        .lines()
        .map(|line| {
            serde_json::from_str::<serde_json::Value>(line).unwrap()["action"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(
        actions,
        vec![
            "HARDWARE_REGISTERED",
            "HARDWARE_REGISTERED",
            "DIAGNOSTIC_RECORDED",
            "DIAGNOSTIC_RECORDED",
            "DIAGNOSTIC_RECORDED",
            "DIAGNOSTIC_RECORDED",
            "REPORT_GENERATED",
            "ESCALATION_SUGGESTED",
        ]
    );
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rackwatch.db");
    let config = ThresholdConfig::default();
    let audit = AuditLog::open(dir.path().join("audit.jsonl"));

    {
        let db = StoreHandle::open_at(&db_path).unwrap();
        let registry = HardwareRegistry::new(&db, &config, &audit);
        let store = DiagnosticStore::new(&db, &config, &audit);
        registry.register("WEB-01", "Server", "Rack 1A", "alice").unwrap();
        store
            .record(DiagnosticReading::new("WEB-01", 45.0, 50.0, 40.0, "alice"))
            .unwrap();
    }

    let db = StoreHandle::open_at(&db_path).unwrap();
    let registry = HardwareRegistry::new(&db, &config, &audit);
    let store = DiagnosticStore::new(&db, &config, &audit);
    assert!(registry.lookup("WEB-01").unwrap().is_some());

    let history = store.history("WEB-01").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].0.temperature, 45.0);
    // Default config caps temperature at 40: the stored classification
    // reflects the thresholds in force when the reading was recorded.
    assert_eq!(history[0].1.issues.len(), 1);
}

#[test]
fn failed_operations_leave_no_trace_but_an_error_event() {
    let w = world();
    let registry = HardwareRegistry::new(&w.db, &w.config, &w.audit);
    let store = DiagnosticStore::new(&w.db, &w.config, &w.audit);

    assert!(registry.register("X-1", "Mainframe", "Rack 9", "alice").is_err());
    assert!(store
        .record(DiagnosticReading::new("X-1", 30.0, 50.0, 40.0, "alice"))
        .is_err());
    assert!(registry.list_all().unwrap().is_empty());
    assert!(store.history("X-1").unwrap().is_empty());

    let content = std::fs::read_to_string(&w.audit_path).unwrap();
    let errors = content
        .lines()
        .filter(|l| l.contains(r#""action":"ERROR""#))
        .count();
    assert_eq!(errors, 2);
}
