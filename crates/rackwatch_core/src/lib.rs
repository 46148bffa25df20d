//! Rackwatch Core - Diagnostic evaluation and reporting engine
//!
//! Tracks data-center hardware inventory, classifies diagnostic readings
//! against configurable thresholds, persists results, aggregates them into
//! reports, derives escalation recommendations and emits an append-only
//! audit trail.
//!
//! Built around explicit context objects constructed once at startup: a
//! [`config::ThresholdConfig`], a [`db::StoreHandle`] and an
//! [`audit::AuditLog`], threaded by reference through every component.

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod escalation;
pub mod evaluator;
pub mod hardware;
pub mod report;
pub mod store;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use config::{Bound, Metric, SeverityPolicy, ThresholdConfig};
pub use db::StoreHandle;
pub use error::{Error, Result};
pub use escalation::{EscalationAdvisor, EscalationPolicy, EscalationSuggestion};
pub use evaluator::{classify, Issue, IssueClassification, Severity};
pub use hardware::{HardwareRecord, HardwareRegistry};
pub use report::{Report, ReportGenerator, Scope, SeverityCounts};
pub use store::{DiagnosticReading, DiagnosticStore};
