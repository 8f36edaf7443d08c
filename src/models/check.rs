//! Check definitions.

use serde::{Deserialize, Serialize};

/// The kind of assertion a check performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// CSS selector or XPath extraction against the page body
    ContentCheck,
    /// Status code assertion plus optional JSON value extraction
    ApiCheck,
    /// Screenshot capture via the screenshot service
    VisualCheck,
    /// File download via the downloader
    DownloadCheck,
    /// Form submission; not implemented, always fails
    FormCheck,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::ContentCheck => "content_check",
            CheckType::ApiCheck => "api_check",
            CheckType::VisualCheck => "visual_check",
            CheckType::DownloadCheck => "download_check",
            CheckType::FormCheck => "form_check",
        }
    }
}

impl std::fmt::Display for CheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an extracted value is compared with `expected_value`.
///
/// Unknown mode strings in a task file fall back to `Contains`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tolerance {
    /// String equality
    Exact,
    /// Substring match
    #[default]
    Contains,
    /// `expected_value` is a regular expression
    Regex,
}

impl From<String> for Tolerance {
    fn from(s: String) -> Self {
        Tolerance::from(s.as_str())
    }
}

impl From<&str> for Tolerance {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Tolerance::Exact,
            "regex" => Tolerance::Regex,
            _ => Tolerance::Contains,
        }
    }
}

impl From<Tolerance> for String {
    fn from(t: Tolerance) -> Self {
        match t {
            Tolerance::Exact => "exact",
            Tolerance::Contains => "contains",
            Tolerance::Regex => "regex",
        }
        .to_string()
    }
}

/// One assertion/extraction unit run against a website response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatrolCheck {
    /// Unique within the owning task
    pub name: String,
    #[serde(rename = "type")]
    pub check_type: CheckType,
    /// Selector, XPath, JSON path, capture mode or download URL depending on type
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub expected_value: Option<String>,
    #[serde(default)]
    pub tolerance: Tolerance,
    #[serde(default)]
    pub description: String,
    /// Restricts the check to a single website of the task
    #[serde(default)]
    pub associated_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PatrolCheck {
    pub fn new(name: impl Into<String>, check_type: CheckType, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            check_type,
            target: target.into(),
            expected_value: None,
            tolerance: Tolerance::default(),
            description: String::new(),
            associated_url: None,
            enabled: true,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>, tolerance: Tolerance) -> Self {
        self.expected_value = Some(expected.into());
        self.tolerance = tolerance;
        self
    }

    pub fn for_url(mut self, url: impl Into<String>) -> Self {
        self.associated_url = Some(url.into());
        self
    }

    /// Whether this check runs against `url`: enabled, and either unbound or bound to `url`.
    pub fn applies_to(&self, url: &str) -> bool {
        if !self.enabled {
            return false;
        }
        match self.associated_url.as_deref() {
            None | Some("") => true,
            Some(bound) => bound == url,
        }
    }

    /// `expected_value`, treating an empty string as unset.
    pub fn expected(&self) -> Option<&str> {
        self.expected_value.as_deref().filter(|v| !v.is_empty())
    }
}
