//! Command execution
//!
//! Thin adapter from parsed CLI arguments to core operations. No decision
//! logic lives here: thresholds, classification, aggregation and escalation
//! policy all belong to rackwatch_core.

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;

use rackwatch_core::{
    AuditLog, DiagnosticReading, DiagnosticStore, EscalationAdvisor, EscalationPolicy,
    HardwareRegistry, Report, ReportGenerator, Scope, Severity, StoreHandle, ThresholdConfig,
};

use crate::cli::Cli;

/// Startup context: configuration, store and audit sink, constructed once
/// and threaded through every command.
pub struct Context {
    pub config: ThresholdConfig,
    pub db: StoreHandle,
    pub audit: AuditLog,
    pub technician: String,
}

impl Context {
    /// Build the context from CLI flags. Any failure here is a startup
    /// failure: the process must not continue with undefined thresholds or
    /// an unreachable store.
    pub fn init(cli: &Cli) -> Result<Self> {
        let config = ThresholdConfig::load_or_init(&cli.config)
            .with_context(|| format!("cannot load configuration from {}", cli.config.display()))?;
        let db = StoreHandle::open_at(&cli.db)
            .with_context(|| format!("cannot open database at {}", cli.db.display()))?;
        Ok(Self {
            config,
            db,
            audit: AuditLog::open(&cli.audit_log),
            technician: cli.technician.clone(),
        })
    }
}

pub fn register(ctx: &Context, serial: &str, hardware_type: &str, location: &str) -> Result<()> {
    let registry = HardwareRegistry::new(&ctx.db, &ctx.config, &ctx.audit);
    let record = registry.register(serial, hardware_type, location, &ctx.technician)?;
    println!(
        "Registered {} ({}) at {}",
        record.serial_number.bold(),
        record.hardware_type,
        record.location
    );
    Ok(())
}

pub fn list(ctx: &Context) -> Result<()> {
    let registry = HardwareRegistry::new(&ctx.db, &ctx.config, &ctx.audit);
    let records = registry.list_all()?;
    if records.is_empty() {
        println!("No hardware registered");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {:<10} {}  (registered by {} at {})",
            record.serial_number.bold(),
            record.hardware_type,
            record.location,
            record.registered_by,
            record.registered_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn record(
    ctx: &Context,
    serial: &str,
    temperature: f64,
    cpu_usage: f64,
    memory_usage: f64,
) -> Result<()> {
    let store = DiagnosticStore::new(&ctx.db, &ctx.config, &ctx.audit);
    let reading = DiagnosticReading::new(serial, temperature, cpu_usage, memory_usage, &ctx.technician);
    let classification = store.record(reading)?;

    if classification.is_empty() {
        println!("{} no issue detected for {serial}", "OK".green().bold());
    } else {
        println!("Issues detected for {serial}:");
        for issue in &classification.issues {
            println!(
                "  {} {} at {:.1} (limit {:.1})",
                severity_tag(issue.severity),
                issue.metric,
                issue.observed,
                issue.threshold
            );
        }
    }
    Ok(())
}

pub fn report(ctx: &Context, serial: Option<String>, json: bool) -> Result<()> {
    let generator = ReportGenerator::new(&ctx.db, &ctx.config, &ctx.audit);
    let scope = scope_for(serial);
    let report = generator.generate(&scope, &ctx.technician)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&scope, &report);
    Ok(())
}

pub fn escalations(
    ctx: &Context,
    serial: Option<String>,
    critical_only: bool,
    repeat: usize,
) -> Result<()> {
    let advisor = EscalationAdvisor::new(&ctx.db, &ctx.config, &ctx.audit);
    let policy = EscalationPolicy {
        min_severity: if critical_only { Severity::Critical } else { Severity::Warning },
        repeat_threshold: repeat,
    };
    let suggestions = advisor.suggest(&scope_for(serial), &policy, &ctx.technician)?;

    if suggestions.is_empty() {
        println!("Nothing to escalate");
        return Ok(());
    }
    println!("Escalation suggestions:");
    for s in &suggestions {
        println!(
            "  {} {} ({}) at {} / {}: {}",
            severity_tag(s.severity),
            s.hardware_serial.bold(),
            s.hardware_type,
            s.location,
            s.metric,
            s.reason
        );
        println!("      -> {}", s.recommended_action);
    }
    Ok(())
}

fn scope_for(serial: Option<String>) -> Scope {
    match serial {
        Some(serial) => Scope::Hardware(serial),
        None => Scope::All,
    }
}

fn severity_tag(severity: Severity) -> String {
    match severity {
        Severity::Warning => "[warning]".yellow().to_string(),
        Severity::Critical => "[critical]".red().bold().to_string(),
    }
}

fn print_report(scope: &Scope, report: &Report) {
    println!("Diagnostic report ({})", scope.describe());
    println!(
        "  Readings: {}   Issues: {} warning, {} critical",
        report.total_readings,
        report.issues_by_severity.warning,
        report.issues_by_severity.critical
    );
    println!("  Hardware:");
    for unit in &report.hardware {
        println!(
            "    {}  {:<10} {}  ({} readings, {} issues)",
            unit.serial_number.bold(),
            unit.hardware_type,
            unit.location,
            unit.total_readings,
            unit.issues_by_severity.total()
        );
    }
    if let Some(reading) = &report.most_recent_reading {
        println!(
            "  Most recent: {} at {} ({:.1}C, {:.1}% cpu, {:.1}% mem)",
            reading.hardware_serial,
            reading.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            reading.temperature,
            reading.cpu_usage,
            reading.memory_usage
        );
    }
    if !report.flagged.is_empty() {
        println!("  Flagged readings:");
        for flagged in &report.flagged {
            for issue in &flagged.classification.issues {
                println!(
                    "    {} {} {} at {:.1} (limit {:.1}) on {}",
                    severity_tag(issue.severity),
                    flagged.hardware_serial,
                    issue.metric,
                    issue.observed,
                    issue.threshold,
                    flagged.recorded_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
}
