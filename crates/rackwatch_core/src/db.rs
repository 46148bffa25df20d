//! SQLite store handle
//!
//! Owns the connection and the schema for the `hardware` and `diagnostics`
//! tables. Constructed once at startup and passed by reference to the
//! components that need it; there is no other shared state.

use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Default database path, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "rackwatch.db";

/// Handle to the durable store.
pub struct StoreHandle {
    pub(crate) conn: Connection,
}

impl StoreHandle {
    /// Open or create the database at `path`.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        // WAL keeps concurrent readers consistent without blocking writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let handle = Self { conn };
        handle.init_schema()?;
        debug!(path = %path.as_ref().display(), "opened diagnostics database");
        Ok(handle)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let handle = Self { conn: Connection::open_in_memory()? };
        handle.init_schema()?;
        Ok(handle)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS hardware (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                serial_number TEXT NOT NULL UNIQUE,
                hardware_type TEXT NOT NULL,
                location TEXT NOT NULL,
                registered_by TEXT NOT NULL,
                registered_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS diagnostics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hardware_serial TEXT NOT NULL REFERENCES hardware(serial_number),
                temperature REAL NOT NULL,
                cpu_usage REAL NOT NULL,
                memory_usage REAL NOT NULL,
                recorded_by TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                issues TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_diag_serial ON diagnostics(hardware_serial);
            CREATE INDEX IF NOT EXISTS idx_diag_serial_time
                ON diagnostics(hardware_serial, recorded_at);
            "#,
        )?;
        Ok(())
    }
}
