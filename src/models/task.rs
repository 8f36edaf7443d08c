//! Patrol task definitions.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_RETRY_COUNT, DEFAULT_START_TIME, DEFAULT_TASK_TIMEOUT_SECS};
use crate::error_handling::PatrolError;
use crate::models::check::PatrolCheck;
use crate::schedule::parse_time_of_day;

/// How often a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Once a day at `start_time`
    #[default]
    Daily,
    /// At each of `multiple_times` every day
    MultipleDaily,
    /// Mondays at `start_time`
    Weekly,
    /// The 1st of each month at `start_time`
    Monthly,
    /// `custom_schedule`, interpreted by a pluggable evaluator
    Custom,
}

/// Authentication settings for a task.
///
/// `type` selects the mechanism (`none`, `basic`, `bearer`, `form`); every
/// other key is passed to the auth provider untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default = "default_auth_type")]
    pub auth_type: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

fn default_auth_type() -> String {
    "none".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_type: default_auth_type(),
            params: BTreeMap::new(),
        }
    }
}

impl AuthConfig {
    pub fn new(auth_type: impl Into<String>) -> Self {
        Self {
            auth_type: auth_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// True when no authentication should be attempted.
    pub fn is_none(&self) -> bool {
        let t = self.auth_type.trim();
        t.is_empty() || t.eq_ignore_ascii_case("none")
    }

    /// A parameter as a string; numbers and booleans are stringified.
    pub fn param(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// A nested object parameter flattened to string pairs (e.g. `additional_fields`).
    pub fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        let Some(serde_json::Value::Object(map)) = self.params.get(key) else {
            return BTreeMap::new();
        };
        map.iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()
    }
}

/// A named, schedulable unit bundling websites, checks and a frequency policy.
///
/// `last_run`, `next_run` and `run_count` belong to the engine. `next_run` is
/// recomputed when the task is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatrolTask {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub websites: Vec<String>,
    #[serde(default)]
    pub checks: Vec<PatrolCheck>,

    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default)]
    pub multiple_times: Vec<String>,
    #[serde(default)]
    pub custom_schedule: Option<String>,

    #[serde(default)]
    pub auth_config: Option<AuthConfig>,

    /// Capture a page screenshot per website for reporting
    #[serde(default = "default_true")]
    pub generate_report: bool,

    /// Per-website request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Reserved for callers; the engine never retries on its own
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub last_run: Option<NaiveDateTime>,
    #[serde(default)]
    pub next_run: Option<NaiveDateTime>,
    #[serde(default)]
    pub run_count: u64,
}

fn default_start_time() -> String {
    DEFAULT_START_TIME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TASK_TIMEOUT_SECS
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

impl PatrolTask {
    pub fn new(name: impl Into<String>, websites: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            websites,
            checks: Vec::new(),
            frequency: Frequency::Daily,
            start_time: default_start_time(),
            multiple_times: Vec::new(),
            custom_schedule: None,
            auth_config: None,
            generate_report: true,
            timeout: DEFAULT_TASK_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            enabled: true,
            last_run: None,
            next_run: None,
            run_count: 0,
        }
    }

    pub fn with_check(mut self, check: PatrolCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The auth config to apply, if any mechanism other than `none` is set.
    pub fn active_auth(&self) -> Option<&AuthConfig> {
        self.auth_config.as_ref().filter(|a| !a.is_none())
    }

    /// Checks the structural invariants of the task definition.
    ///
    /// # Errors
    ///
    /// Returns `PatrolError::InvalidTask` describing the first violation found.
    pub fn validate(&self) -> Result<(), PatrolError> {
        let invalid = |msg: String| Err(PatrolError::InvalidTask(format!("{}: {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(PatrolError::InvalidTask("task name is empty".to_string()));
        }
        if self.timeout == 0 {
            return invalid("timeout must be at least one second".to_string());
        }

        parse_time_of_day(&self.start_time)?;
        match self.frequency {
            Frequency::MultipleDaily => {
                if self.multiple_times.is_empty() {
                    return invalid("multiple_daily frequency requires multiple_times".to_string());
                }
                for t in &self.multiple_times {
                    parse_time_of_day(t)?;
                }
            }
            Frequency::Custom => {
                let has_schedule = self
                    .custom_schedule
                    .as_deref()
                    .is_some_and(|s| !s.trim().is_empty());
                if !has_schedule {
                    return invalid("custom frequency requires custom_schedule".to_string());
                }
            }
            Frequency::Daily | Frequency::Weekly | Frequency::Monthly => {}
        }

        for site in &self.websites {
            match url::Url::parse(site) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                Ok(u) => return invalid(format!("unsupported scheme '{}' in {site}", u.scheme())),
                Err(e) => return invalid(format!("invalid website URL '{site}': {e}")),
            }
        }

        let mut seen = HashSet::new();
        for check in &self.checks {
            if !seen.insert(check.name.as_str()) {
                return invalid(format!("duplicate check name '{}'", check.name));
            }
        }
        Ok(())
    }
}
