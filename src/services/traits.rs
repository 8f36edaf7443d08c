//! Collaborator interfaces consumed by the engine and check executor.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error_handling::PatrolError;
use crate::models::AuthConfig;

/// Headers and cookies produced by an [`AuthProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

impl AuthContext {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.cookies.is_empty()
    }

    /// Cookies rendered as a single `Cookie` header value (`a=1; b=2`).
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Adds the headers and cookie header to an outgoing request.
    pub fn apply(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = self.cookie_header() {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        builder
    }
}

/// Acquires credentials for a task's `auth_config`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `PatrolError::AuthFailure` when credentials are missing or the
    /// login is rejected.
    async fn authenticate(
        &self,
        auth_type: &str,
        config: &AuthConfig,
    ) -> Result<AuthContext, PatrolError>;
}

/// What part of a page a screenshot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureMode {
    FullPage,
    Viewport,
    /// A single element matched by this CSS selector
    Element(String),
}

impl CaptureMode {
    /// Interprets a visual check target.
    ///
    /// `full` (or `全页`) is a full-page capture, empty or `viewport` the
    /// viewport. Anything else that parses as a CSS selector captures that
    /// element; the rest falls back to the viewport.
    pub fn from_target(target: &str) -> Self {
        let target = target.trim();
        match target {
            "full" | "全页" => CaptureMode::FullPage,
            "" | "viewport" => CaptureMode::Viewport,
            selector if scraper::Selector::parse(selector).is_ok() => {
                CaptureMode::Element(selector.to_string())
            }
            _ => CaptureMode::Viewport,
        }
    }
}

/// Renders pages to image files.
#[async_trait]
pub trait ScreenshotService: Send + Sync {
    /// Captures `url` and returns the image path. `name` seeds the file name.
    async fn capture(
        &self,
        url: &str,
        name: &str,
        mode: &CaptureMode,
        auth: &AuthContext,
    ) -> Result<PathBuf, PatrolError>;
}

/// Fetches files to local storage.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads `url` and returns the stored path. `name` seeds the file name.
    async fn download(&self, url: &str, name: &str) -> Result<PathBuf, PatrolError>;
}
