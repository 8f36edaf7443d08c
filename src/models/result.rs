//! Patrol results and run bookkeeping.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::models::check::CheckType;

/// Type-dependent primary value of a check.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CheckValue {
    #[default]
    None,
    /// Substring/pattern found or not
    Found(bool),
    /// Number of elements a selector matched
    Count(usize),
    /// HTTP status observed by an API check
    StatusCode(u16),
    /// Screenshot or download location
    Path(String),
}

/// Outcome of one check against one website.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check_type: CheckType,
    pub success: bool,
    pub value: CheckValue,
    pub extracted_value: Option<String>,
    /// Human-readable description of what happened
    pub message: String,
    /// Present only when an expected value was validated
    pub validation_success: Option<bool>,
}

impl CheckResult {
    pub fn new(check_type: CheckType) -> Self {
        Self {
            check_type,
            success: false,
            value: CheckValue::None,
            extracted_value: None,
            message: String::new(),
            validation_success: None,
        }
    }

    pub fn failed(check_type: CheckType, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::new(check_type)
        }
    }
}

/// Result of patrolling a single website within a task run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatrolResult {
    pub task_name: String,
    pub website_url: String,
    pub timestamp: NaiveDateTime,
    pub success: bool,

    pub status_code: Option<u16>,
    /// Seconds from request start to body received
    pub response_time: Option<f64>,
    /// Body size in bytes
    pub content_size: Option<usize>,

    pub check_results: BTreeMap<String, CheckResult>,

    pub error_message: Option<String>,

    pub screenshot_path: Option<String>,
    pub downloaded_files: Vec<String>,
    /// Extracted check values keyed by check name
    pub extracted_data: BTreeMap<String, String>,
}

impl PatrolResult {
    pub fn new(task_name: impl Into<String>, website_url: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            website_url: website_url.into(),
            timestamp: Local::now().naive_local(),
            success: false,
            status_code: None,
            response_time: None,
            content_size: None,
            check_results: BTreeMap::new(),
            error_message: None,
            screenshot_path: None,
            downloaded_files: Vec::new(),
            extracted_data: BTreeMap::new(),
        }
    }

    /// Names of checks that ran and failed.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.check_results
            .iter()
            .filter(|(_, r)| !r.success)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Execution state of a task as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Idle,
    Running,
}

/// Whether every website in a run succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// Summary of one completed `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub task_name: String,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub websites: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn from_results(
        task_name: &str,
        started_at: NaiveDateTime,
        results: &[PatrolResult],
    ) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self {
            task_name: task_name.to_string(),
            started_at,
            finished_at: Local::now().naive_local(),
            websites: results.len(),
            succeeded,
            failed,
            outcome: if failed == 0 {
                RunOutcome::Succeeded
            } else {
                RunOutcome::Failed
            },
        }
    }
}
