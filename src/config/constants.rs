//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the application,
//! including timeouts, size limits, and defaults applied to patrol tasks.

use std::time::Duration;

// Task defaults
/// Per-website request timeout in seconds when a task does not set one
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 30;
/// Retry count recorded on tasks that do not set one.
/// Reserved: the engine never retries on its own.
pub const DEFAULT_RETRY_COUNT: u32 = 2;
/// Start time used by daily/weekly/monthly schedules when none is configured
pub const DEFAULT_START_TIME: &str = "09:00";

/// HTTP status codes that count as a successful page fetch
pub const SUCCESS_STATUS_CODES: &[u16] = &[200, 201, 202];
/// Status code an API check requires
pub const API_SUCCESS_STATUS: u16 = 200;

// Scheduler
/// How often the scheduler loop compares `now` against each task's next run
pub const DEFAULT_TICK_SECS: u64 = 30;
/// Number of run summaries retained per task
pub const MAX_RUN_HISTORY: usize = 50;

// Client
/// Client-level ceiling for any single request in seconds.
/// Task timeouts are applied per request on top of this.
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 120;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent string for HTTP requests.
///
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Authentication
/// Lifetime of a cached authentication session
pub const AUTH_SESSION_TIMEOUT: Duration = Duration::from_secs(3600);
/// Status codes accepted from a form login POST (302 = redirect after login)
pub const FORM_LOGIN_ACCEPTED_STATUS: &[u16] = &[200, 302];

// Downloads
/// Maximum size of a downloaded file in bytes (100MB)
/// Larger downloads are aborted and the partial file is removed
pub const MAX_DOWNLOAD_SIZE: u64 = 100 * 1024 * 1024;
/// Directory downloads land in when none is configured
pub const DEFAULT_DOWNLOAD_DIR: &str = "data/downloads";

// Variables
/// File extensions that make an auto-typed variable an image
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp"];
/// Long human-readable timestamp used for `patrol_time_formatted_<task>`
pub const LONG_DATETIME_FORMAT: &str = "%A, %B %-d, %Y %H:%M:%S";

// Message size limits
/// Maximum number of characters of an extracted value quoted in a check message
pub const MAX_MESSAGE_PREVIEW_CHARS: usize = 100;
/// Maximum number of characters of a response body kept in `api_response_*` variables
pub const MAX_API_RESPONSE_CHARS: usize = 2000;
/// Maximum error message length in characters (2000 chars)
/// Error messages longer than this are truncated with a note about the original length
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;
