//! Audit Log
//!
//! Append-only JSONL audit trail of every state-changing or
//! decision-producing action. Write-only from the core's perspective:
//! nothing in here reads the log back. Rotation archives the current file
//! once it crosses the size ceiling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// Default audit log path, relative to the working directory.
pub const DEFAULT_AUDIT_PATH: &str = "rackwatch_audit.jsonl";

/// Maximum audit log size before rotation (10 MB).
pub const MAX_AUDIT_LOG_SIZE: u64 = 10_485_760;

/// Audited action types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    HardwareRegistered,
    DiagnosticRecorded,
    ReportGenerated,
    EscalationSuggested,
    Error,
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub technician: String,
    pub action: AuditAction,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(action: AuditAction, technician: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            technician: technician.to_string(),
            action,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Append-only audit sink.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open the audit log at `path`. The file is created on first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Append one entry, rotating first if the log is over the size ceiling.
    pub fn log(&self, entry: &AuditEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        rotate_if_needed(&self.path, MAX_AUDIT_LOG_SIZE)?;

        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{json}")?;
        file.sync_all()?;
        Ok(())
    }

    /// Record a failed operation as an ERROR event.
    ///
    /// Called on paths that already carry an error to the caller, so an audit
    /// write failure here must not mask the original error; it is surfaced
    /// through the process log instead.
    pub fn log_failure(&self, technician: &str, context: &str, err: &Error) {
        let entry = AuditEntry::new(AuditAction::Error, technician).with_details(serde_json::json!({
            "context": context,
            "error": err.to_string(),
        }));
        if let Err(audit_err) = self.log(&entry) {
            warn!(context, error = %audit_err, "failed to write ERROR audit entry");
        }
    }
}

/// Archive the log into a sibling `archive/` directory once it exceeds
/// `max_size`.
fn rotate_if_needed(path: &Path, max_size: u64) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let metadata = fs::metadata(path)?;
    if metadata.len() < max_size {
        return Ok(());
    }

    let archive_dir = path.parent().unwrap_or_else(|| Path::new(".")).join("archive");
    fs::create_dir_all(&archive_dir)?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let archive_path = archive_dir.join(format!("audit_{timestamp}.jsonl"));
    fs::rename(path, archive_path)?;
    Ok(())
}
