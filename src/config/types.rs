//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_CLIENT_TIMEOUT_SECS, DEFAULT_DOWNLOAD_DIR, DEFAULT_TICK_SECS, DEFAULT_USER_AGENT,
};

/// Log verbosity, from `Error` (quietest) to `Trace`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    /// Patrol results and run summaries (default)
    #[default]
    Info,
    /// Adds per-check detail and scheduler ticks
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored text for terminals
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

/// Runtime configuration.
///
/// Parsed from the command line by the binary, or built programmatically:
///
/// ```no_run
/// use site_patrol::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     tasks: PathBuf::from("tasks.json"),
///     once: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(name = "site_patrol", about = "Scheduled website content patrol")]
pub struct Config {
    /// JSON file holding the patrol task definitions
    #[arg(value_name = "TASKS")]
    pub tasks: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Client-level ceiling for a single request in seconds
    #[arg(long, default_value_t = DEFAULT_CLIENT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Seconds between scheduler ticks
    #[arg(long, default_value_t = DEFAULT_TICK_SECS)]
    pub tick_seconds: u64,

    /// Directory download checks write into
    #[arg(long, default_value = DEFAULT_DOWNLOAD_DIR)]
    pub download_dir: PathBuf,

    /// Execute every enabled task once and exit instead of scheduling
    #[arg(long)]
    pub once: bool,

    /// Execute only the named task once and exit
    #[arg(long, conflicts_with = "once")]
    pub task: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks: PathBuf::from("tasks.json"),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            timeout_seconds: DEFAULT_CLIENT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tick_seconds: DEFAULT_TICK_SECS,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            once: false,
            task: None,
        }
    }
}
