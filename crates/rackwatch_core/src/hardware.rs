//! Hardware Registry
//!
//! Owns hardware identity: serial number, type and location. Records are
//! immutable once registered; there is deliberately no update or delete.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::config::ThresholdConfig;
use crate::db::StoreHandle;
use crate::error::{Error, Result};

/// One registered hardware unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareRecord {
    pub serial_number: String,
    pub hardware_type: String,
    pub location: String,
    pub registered_by: String,
    pub registered_at: DateTime<Utc>,
}

/// Registry over the durable store. Validates types against the
/// configuration whitelist and enforces serial uniqueness.
pub struct HardwareRegistry<'a> {
    db: &'a StoreHandle,
    config: &'a ThresholdConfig,
    audit: &'a AuditLog,
}

impl<'a> HardwareRegistry<'a> {
    pub fn new(db: &'a StoreHandle, config: &'a ThresholdConfig, audit: &'a AuditLog) -> Self {
        Self { db, config, audit }
    }

    /// Register a new hardware unit.
    ///
    /// Fails with [`Error::DuplicateSerial`] if the serial is taken and
    /// [`Error::InvalidType`] if the type is not on the configured whitelist.
    /// Failures leave the registry unchanged and are audited as ERROR.
    pub fn register(
        &self,
        serial: &str,
        hardware_type: &str,
        location: &str,
        technician: &str,
    ) -> Result<HardwareRecord> {
        self.try_register(serial, hardware_type, location, technician)
            .inspect_err(|e| self.audit.log_failure(technician, "register hardware", e))
    }

    fn try_register(
        &self,
        serial: &str,
        hardware_type: &str,
        location: &str,
        technician: &str,
    ) -> Result<HardwareRecord> {
        if !self.config.is_valid_type(hardware_type) {
            return Err(Error::InvalidType {
                given: hardware_type.to_string(),
                allowed: self.config.hardware_types.clone(),
            });
        }
        if self.lookup(serial)?.is_some() {
            return Err(Error::DuplicateSerial(serial.to_string()));
        }

        let record = HardwareRecord {
            serial_number: serial.to_string(),
            hardware_type: hardware_type.to_string(),
            location: location.to_string(),
            registered_by: technician.to_string(),
            registered_at: Utc::now(),
        };
        self.db.conn.execute(
            "INSERT INTO hardware (serial_number, hardware_type, location, registered_by, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.serial_number,
                record.hardware_type,
                record.location,
                record.registered_by,
                record.registered_at,
            ],
        )?;

        info!(serial, hardware_type, location, "registered hardware");
        self.audit.log(
            &AuditEntry::new(AuditAction::HardwareRegistered, technician).with_details(
                serde_json::json!({
                    "serial": record.serial_number,
                    "hardware_type": record.hardware_type,
                    "location": record.location,
                }),
            ),
        )?;
        Ok(record)
    }

    /// Look up one hardware unit by serial.
    pub fn lookup(&self, serial: &str) -> Result<Option<HardwareRecord>> {
        let record = self
            .db
            .conn
            .query_row(
                "SELECT serial_number, hardware_type, location, registered_by, registered_at
                 FROM hardware WHERE serial_number = ?1",
                params![serial],
                |row| {
                    Ok(HardwareRecord {
                        serial_number: row.get(0)?,
                        hardware_type: row.get(1)?,
                        location: row.get(2)?,
                        registered_by: row.get(3)?,
                        registered_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// All registered hardware, in registration order.
    pub fn list_all(&self) -> Result<Vec<HardwareRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT serial_number, hardware_type, location, registered_by, registered_at
             FROM hardware ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(HardwareRecord {
                serial_number: row.get(0)?,
                hardware_type: row.get(1)?,
                location: row.get(2)?,
                registered_by: row.get(3)?,
                registered_at: row.get(4)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
