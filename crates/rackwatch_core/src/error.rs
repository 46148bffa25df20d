//! Error types for rackwatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hardware with serial number {0} already exists")]
    DuplicateSerial(String),

    #[error("Hardware type {given} is not supported. Choose from {allowed:?}")]
    InvalidType { given: String, allowed: Vec<String> },

    #[error("Hardware with serial number {0} not found")]
    UnknownHardware(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Fatal errors abort startup; the rest are reported to the caller
    /// and leave state untouched.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
