//! Rackwatch Control - CLI for the diagnostics engine
//!
//! Translates commands into core operations: register hardware, record
//! diagnostic readings, generate reports, suggest escalations.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Context;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let ctx = Context::init(&cli)?;

    match cli.command {
        Commands::Register { ref serial, ref hardware_type, ref location } => {
            commands::register(&ctx, serial, hardware_type, location)
        }
        Commands::List => commands::list(&ctx),
        Commands::Record { ref serial, temperature, cpu_usage, memory_usage } => {
            commands::record(&ctx, serial, temperature, cpu_usage, memory_usage)
        }
        Commands::Report { serial, json } => commands::report(&ctx, serial, json),
        Commands::Escalations { serial, critical_only, repeat } => {
            commands::escalations(&ctx, serial, critical_only, repeat)
        }
    }
}
