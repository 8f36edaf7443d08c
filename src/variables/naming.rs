//! Variable naming.
//!
//! Report templates key off these exact names, so the rules are fixed:
//! every name component passes through [`safe_name`] (or [`safe_url`] for
//! URLs), which keeps only `[A-Za-z0-9_]`.

/// Strips every character outside `[A-Za-z0-9_]`.
pub fn safe_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// URL component of a variable name.
///
/// The scheme is dropped and every character outside `[A-Za-z0-9_]` becomes
/// `_`, so `https://example.com/a-b` yields `example_com_a_b`.
pub fn safe_url(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.trim_end_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Per-check variable kinds: `<kind>_<check>_<task>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Extracted,
    Status,
    Timestamp,
    ApiStatus,
    ApiResponse,
    Visual,
    DownloadPath,
    DownloadSize,
    DownloadName,
}

impl VariableKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            VariableKind::Extracted => "extracted",
            VariableKind::Status => "status",
            VariableKind::Timestamp => "timestamp",
            VariableKind::ApiStatus => "api_status",
            VariableKind::ApiResponse => "api_response",
            VariableKind::Visual => "visual",
            VariableKind::DownloadPath => "download_path",
            VariableKind::DownloadSize => "download_size",
            VariableKind::DownloadName => "download_name",
        }
    }
}

/// Per-website variable kinds: `<kind>_<task>_<url>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebsiteVariable {
    Status,
    ResponseTime,
    ContentSize,
    Screenshot,
}

impl WebsiteVariable {
    pub fn prefix(&self) -> &'static str {
        match self {
            WebsiteVariable::Status => "status",
            WebsiteVariable::ResponseTime => "response_time",
            WebsiteVariable::ContentSize => "content_size",
            WebsiteVariable::Screenshot => "screenshot",
        }
    }
}

/// Per-run timestamp variables: `<kind>_<task>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunVariable {
    /// `HH:MM:SS`
    Time,
    /// Long human-readable date and time
    TimeFormatted,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
}

impl RunVariable {
    pub fn prefix(&self) -> &'static str {
        match self {
            RunVariable::Time => "patrol_time",
            RunVariable::TimeFormatted => "patrol_time_formatted",
            RunVariable::Date => "patrol_date",
            RunVariable::DateTime => "patrol_datetime",
        }
    }
}

pub fn check_variable_name(kind: VariableKind, check_name: &str, task_name: &str) -> String {
    format!(
        "{}_{}_{}",
        kind.prefix(),
        safe_name(check_name),
        safe_name(task_name)
    )
}

pub fn website_variable_name(kind: WebsiteVariable, task_name: &str, url: &str) -> String {
    format!("{}_{}_{}", kind.prefix(), safe_name(task_name), safe_url(url))
}

pub fn run_variable_name(kind: RunVariable, task_name: &str) -> String {
    format!("{}_{}", kind.prefix(), safe_name(task_name))
}

/// `data_<key>_<task>` for entries of a result's `extracted_data`.
pub fn data_variable_name(key: &str, task_name: &str) -> String {
    format!("data_{}_{}", safe_name(key), safe_name(task_name))
}
