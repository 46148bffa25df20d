//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Keeps argument parsing separate
//! from execution logic: every subcommand maps onto exactly one core
//! operation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rackwatch CLI
#[derive(Parser)]
#[command(name = "rackwatchctl")]
#[command(about = "Rackwatch - Data-center hardware diagnostics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the threshold configuration (created with defaults if absent)
    #[arg(long, global = true, default_value = rackwatch_core::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Path to the diagnostics database
    #[arg(long, global = true, default_value = rackwatch_core::db::DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Path to the audit log
    #[arg(long, global = true, default_value = rackwatch_core::audit::DEFAULT_AUDIT_PATH)]
    pub audit_log: PathBuf,

    /// Technician recorded on actions and in the audit trail
    #[arg(short, long, global = true, default_value = "system")]
    pub technician: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Register a hardware unit
    Register {
        /// Serial number (must be unique)
        serial: String,

        /// Hardware type (must be on the configured whitelist)
        #[arg(value_name = "TYPE")]
        hardware_type: String,

        /// Physical location (e.g. "Rack 1A")
        location: String,
    },

    /// List registered hardware
    List,

    /// Record a diagnostic reading
    Record {
        /// Serial number of a registered hardware unit
        serial: String,

        /// Temperature in degrees Celsius
        #[arg(long)]
        temperature: f64,

        /// CPU usage percentage
        #[arg(long)]
        cpu_usage: f64,

        /// Memory usage percentage
        #[arg(long)]
        memory_usage: f64,
    },

    /// Generate a diagnostic report for one unit or all hardware
    Report {
        /// Serial number (omit for all hardware)
        serial: Option<String>,

        /// Output JSON instead of the human-readable report
        #[arg(long)]
        json: bool,
    },

    /// Suggest escalations for one unit or all hardware
    Escalations {
        /// Serial number (omit for all hardware)
        serial: Option<String>,

        /// Only escalate critical-severity issues
        #[arg(long)]
        critical_only: bool,

        /// Consecutive-breach count that escalates on its own
        #[arg(long, default_value_t = 3)]
        repeat: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_record_parses_metric_flags() {
        let cli = Cli::parse_from([
            "rackwatchctl",
            "--technician",
            "alice",
            "record",
            "SN-1",
            "--temperature",
            "42.5",
            "--cpu-usage",
            "80",
            "--memory-usage",
            "55",
        ]);
        assert_eq!(cli.technician, "alice");
        match cli.command {
            Commands::Record { serial, temperature, cpu_usage, memory_usage } => {
                assert_eq!(serial, "SN-1");
                assert_eq!(temperature, 42.5);
                assert_eq!(cpu_usage, 80.0);
                assert_eq!(memory_usage, 55.0);
            }
            _ => panic!("expected record command"),
        }
    }

    #[test]
    fn test_report_scope_defaults_to_all() {
        let cli = Cli::parse_from(["rackwatchctl", "report"]);
        match cli.command {
            Commands::Report { serial, json } => {
                assert!(serial.is_none());
                assert!(!json);
            }
            _ => panic!("expected report command"),
        }
    }
}
