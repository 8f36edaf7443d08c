//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_patrol` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use site_patrol::initialization::init_logger_with;
use site_patrol::{run_patrol, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    init_logger_with(config.log_level.into(), config.log_format)
        .context("Failed to initialize logger")?;

    match run_patrol(config).await {
        Ok(report) => {
            println!(
                "Patrolled {} website{} across {} run{} ({} succeeded, {} failed) in {:.1}s, {} variables recorded",
                report.websites,
                if report.websites == 1 { "" } else { "s" },
                report.tasks_run,
                if report.tasks_run == 1 { "" } else { "s" },
                report.succeeded,
                report.failed,
                report.elapsed_seconds,
                report.variables
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("site_patrol error: {:#}", e);
            process::exit(1);
        }
    }
}
