//! Check execution.
//!
//! `CheckExecutor` dispatches on `CheckType`, runs the check against one
//! website response and records the derived variables
//! (`<kind>_<check>_<task>`) in the shared `VariableStore`.

mod api;
mod content;
mod download;
pub mod json_path;
mod validation;
mod visual;
pub mod xpath;

use std::sync::Arc;

use chrono::Local;

use crate::config::MAX_API_RESPONSE_CHARS;
use crate::models::{CheckResult, CheckType, CheckValue, PatrolCheck, PatrolTask};
use crate::services::{AuthContext, Downloader, ScreenshotService};
use crate::utils::{preview, sanitize_and_truncate_error_message};
use crate::variables::{check_variable_name, VariableKind, VariableStore, VariableType};

pub use validation::validate;

/// Response facts a check may need besides the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMeta {
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Seconds from request start to body received
    pub response_time: f64,
    /// Body size in bytes
    pub content_size: usize,
}

impl ResponseMeta {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

/// Runs checks and writes their derived variables.
#[derive(Clone)]
pub struct CheckExecutor {
    variables: Arc<VariableStore>,
    screenshots: Option<Arc<dyn ScreenshotService>>,
    downloader: Option<Arc<dyn Downloader>>,
}

impl std::fmt::Debug for CheckExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckExecutor")
            .field("variables", &self.variables.len())
            .field("screenshots", &self.screenshots.is_some())
            .field("downloader", &self.downloader.is_some())
            .finish()
    }
}

impl CheckExecutor {
    pub fn new(variables: Arc<VariableStore>) -> Self {
        Self {
            variables,
            screenshots: None,
            downloader: None,
        }
    }

    pub fn with_screenshot_service(mut self, service: Arc<dyn ScreenshotService>) -> Self {
        self.screenshots = Some(service);
        self
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    pub fn screenshot_service(&self) -> Option<&Arc<dyn ScreenshotService>> {
        self.screenshots.as_ref()
    }

    /// Runs `check` against one website response.
    ///
    /// Never fails: every problem is reported through the returned result's
    /// `success` and `message`.
    pub async fn execute(
        &self,
        check: &PatrolCheck,
        task: &PatrolTask,
        url: &str,
        body: &str,
        meta: &ResponseMeta,
        auth: &AuthContext,
    ) -> CheckResult {
        let mut result = match check.check_type {
            CheckType::ContentCheck => content::run(check, body),
            CheckType::ApiCheck => api::run(check, body, meta),
            CheckType::VisualCheck => {
                visual::run(self.screenshots.as_deref(), check, task, url, auth).await
            }
            CheckType::DownloadCheck => {
                let (result, info) =
                    download::run(self.downloader.as_deref(), check, task, url).await;
                if let Some(info) = info {
                    self.record_download(check, task, &info);
                }
                result
            }
            CheckType::FormCheck => CheckResult::failed(
                CheckType::FormCheck,
                "form checks are not implemented",
            ),
        };
        result.message = sanitize_and_truncate_error_message(&result.message);

        self.record(check, task, body, meta, &result);
        result
    }

    fn record(
        &self,
        check: &PatrolCheck,
        task: &PatrolTask,
        body: &str,
        meta: &ResponseMeta,
        result: &CheckResult,
    ) {
        let name = |kind| check_variable_name(kind, &check.name, &task.name);
        let source = format!("{} ({})", check.name, check.check_type);

        self.variables.set(
            &name(VariableKind::Status),
            if result.success { "success" } else { "failed" },
            Some(VariableType::Text),
            &format!("Check status: {source}"),
        );
        self.variables.set(
            &name(VariableKind::Timestamp),
            Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
            Some(VariableType::Text),
            &format!("Check time: {source}"),
        );
        if let Some(extracted) = &result.extracted_value {
            self.variables.set(
                &name(VariableKind::Extracted),
                extracted.as_str(),
                Some(VariableType::Text),
                &format!("Extracted value: {source}"),
            );
        }

        match (check.check_type, &result.value) {
            (CheckType::ApiCheck, _) => {
                self.variables.set(
                    &name(VariableKind::ApiStatus),
                    meta.status_code,
                    Some(VariableType::Number),
                    &format!("API status code: {source}"),
                );
                let response = result
                    .extracted_value
                    .clone()
                    .unwrap_or_else(|| preview(body, MAX_API_RESPONSE_CHARS));
                self.variables.set(
                    &name(VariableKind::ApiResponse),
                    response,
                    Some(VariableType::Text),
                    &format!("API response: {source}"),
                );
            }
            (CheckType::VisualCheck, CheckValue::Path(path)) => {
                self.variables.set(
                    &name(VariableKind::Visual),
                    path.as_str(),
                    Some(VariableType::Image),
                    &format!("Screenshot: {source}"),
                );
            }
            _ => {}
        }
    }

    fn record_download(&self, check: &PatrolCheck, task: &PatrolTask, info: &download::DownloadInfo) {
        let name = |kind| check_variable_name(kind, &check.name, &task.name);
        self.variables.set(
            &name(VariableKind::DownloadPath),
            info.path.display().to_string(),
            Some(VariableType::File),
            &format!("Downloaded file: {}", check.name),
        );
        if let Some(size) = info.size {
            self.variables.set(
                &name(VariableKind::DownloadSize),
                size,
                Some(VariableType::Number),
                &format!("Download size in bytes: {}", check.name),
            );
        }
        if let Some(file_name) = &info.file_name {
            self.variables.set(
                &name(VariableKind::DownloadName),
                file_name.as_str(),
                Some(VariableType::Text),
                &format!("Download file name: {}", check.name),
            );
        }
    }
}
