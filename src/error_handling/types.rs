//! Error type definitions.
//!
//! This module defines all error types used throughout the application.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors raised by the patrol engine and its collaborators.
///
/// Only `NotFound`, `AlreadyRunning` and `InvalidTask` ever escape
/// `PatrolEngine::execute`/`add_task`. The remaining variants are captured
/// into a result's `error_message` or a check's `message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatrolError {
    /// No task is registered under this name.
    #[error("Patrol task not found: {0}")]
    NotFound(String),

    /// An execution of this task is already in flight.
    #[error("Patrol task already running: {0}")]
    AlreadyRunning(String),

    /// The authentication collaborator failed.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// The request exceeded the task timeout.
    #[error("Request timed out ({timeout_secs}s): {url}")]
    NetworkTimeout {
        /// URL that timed out
        url: String,
        /// Timeout that was exceeded
        timeout_secs: u64,
    },

    /// Any other transport failure.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A check could not run to completion.
    #[error("Check '{check}' failed to execute: {message}")]
    CheckExecutionError {
        /// Check name
        check: String,
        /// What went wrong
        message: String,
    },

    /// Bad regex, malformed selector or JSON path and similar user input problems.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The task definition violates a structural invariant.
    #[error("Invalid patrol task: {0}")]
    InvalidTask(String),
}

impl PatrolError {
    /// The taxonomy bucket this error is counted under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatrolError::NotFound(_) => ErrorKind::NotFound,
            PatrolError::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            PatrolError::AuthFailure(_) => ErrorKind::AuthFailure,
            PatrolError::NetworkTimeout { .. } => ErrorKind::NetworkTimeout,
            PatrolError::NetworkError(_) => ErrorKind::NetworkError,
            PatrolError::CheckExecutionError { .. } => ErrorKind::CheckExecutionError,
            PatrolError::ValidationError(_) => ErrorKind::ValidationError,
            PatrolError::InvalidTask(_) => ErrorKind::InvalidTask,
        }
    }
}

/// Errors from schedule computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A time of day is not in `HH:MM` form or out of range.
    #[error("Invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    /// `multiple_daily` frequency without any times.
    #[error("multiple_daily frequency requires at least one time")]
    MissingTimes,

    /// The custom schedule evaluator rejected the expression.
    #[error("Invalid custom schedule '{0}'")]
    InvalidCustomSchedule(String),
}

impl From<ScheduleError> for PatrolError {
    fn from(e: ScheduleError) -> Self {
        PatrolError::InvalidTask(e.to_string())
    }
}

/// XPath expressions outside the supported subset.
///
/// Supported: absolute (`/a/b`) and descendant (`//a//b`) steps over element
/// names or `*`, positional (`[2]`, `[last()]`) and attribute predicates
/// (`[@id]`, `[@id='x']`, `[contains(@class,'x')]`, `[starts-with(@href,'x')]`),
/// and a trailing `text()` or `@attr` step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XPathError {
    #[error("empty XPath expression")]
    Empty,

    #[error("unsupported XPath step '{0}'")]
    UnsupportedStep(String),

    #[error("unsupported XPath predicate '[{0}]'")]
    UnsupportedPredicate(String),

    #[error("unbalanced brackets or quotes in XPath '{0}'")]
    Unbalanced(String),
}

/// Problems resolving a dotted path inside a JSON document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonPathError {
    #[error("malformed JSON path '{0}'")]
    Malformed(String),

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
}

impl From<XPathError> for PatrolError {
    fn from(e: XPathError) -> Self {
        PatrolError::ValidationError(e.to_string())
    }
}

impl From<JsonPathError> for PatrolError {
    fn from(e: JsonPathError) -> Self {
        PatrolError::ValidationError(e.to_string())
    }
}

/// Errors from variable export/import.
#[derive(Error, Debug)]
pub enum VariableStoreError {
    /// Reading or writing the export file failed.
    #[error("Variable file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The export file is not valid JSON of the expected shape.
    #[error("Variable file format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories of failures counted during patrol runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorKind {
    NotFound,
    AlreadyRunning,
    AuthFailure,
    NetworkTimeout,
    NetworkError,
    HttpStatusError, // page fetched but status outside the success set
    CheckFailed,     // check ran and reported failure
    CheckExecutionError,
    ValidationError,
    InvalidTask,
    ObserverError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "Task not found",
            ErrorKind::AlreadyRunning => "Task already running",
            ErrorKind::AuthFailure => "Authentication failure",
            ErrorKind::NetworkTimeout => "Network timeout",
            ErrorKind::NetworkError => "Network error",
            ErrorKind::HttpStatusError => "Unsuccessful HTTP status",
            ErrorKind::CheckFailed => "Check failed",
            ErrorKind::CheckExecutionError => "Check execution error",
            ErrorKind::ValidationError => "Validation error",
            ErrorKind::InvalidTask => "Invalid task",
            ErrorKind::ObserverError => "Result observer error",
        }
    }
}
