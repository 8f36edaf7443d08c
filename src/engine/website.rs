//! Patrolling a single website within a task run.

use std::time::Instant;

use log::{info, warn};

use crate::checks::ResponseMeta;
use crate::config::SUCCESS_STATUS_CODES;
use crate::engine::fetch::fetch_page;
use crate::engine::PatrolEngine;
use crate::error_handling::{ErrorKind, PatrolError};
use crate::models::{CheckType, CheckValue, PatrolResult, PatrolTask};
use crate::services::{AuthContext, CaptureMode};
use crate::utils::sanitize_and_truncate_error_message;
use crate::variables::{
    data_variable_name, safe_name, safe_url, website_variable_name, VariableType,
    WebsiteVariable,
};

impl PatrolEngine {
    /// Fetches `url`, runs the applicable checks and assembles the result.
    ///
    /// Failures are captured into the result; nothing here aborts the run.
    pub(super) async fn patrol_website(
        &self,
        task: &PatrolTask,
        url: &str,
        auth: &AuthContext,
    ) -> PatrolResult {
        let mut result = PatrolResult::new(&task.name, url);
        self.stats.increment_websites();

        let timeout = task.timeout_duration();
        let started = Instant::now();
        let fetched = tokio::time::timeout(timeout, fetch_page(&self.client, url, timeout, auth))
            .await
            .unwrap_or_else(|_| {
                Err(PatrolError::NetworkTimeout {
                    url: url.to_string(),
                    timeout_secs: task.timeout,
                })
            });

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!("Patrol error for {url}: {e}");
                self.stats.increment_error(e.kind());
                result.response_time = Some(match &e {
                    PatrolError::NetworkTimeout { .. } => task.timeout as f64,
                    _ => started.elapsed().as_secs_f64(),
                });
                result.error_message = Some(sanitize_and_truncate_error_message(&e.to_string()));
                return result;
            }
        };

        result.status_code = Some(page.status);
        result.response_time = Some(started.elapsed().as_secs_f64());
        result.content_size = Some(page.body.len());

        let mut success = SUCCESS_STATUS_CODES.contains(&page.status);
        if !success {
            self.stats.increment_error(ErrorKind::HttpStatusError);
        }

        let meta = ResponseMeta {
            status_code: page.status,
            content_type: page.content_type.clone(),
            response_time: result.response_time.unwrap_or_default(),
            content_size: page.body.len(),
        };
        for check in task.checks.iter().filter(|c| c.applies_to(url)) {
            let check_result = self
                .executor
                .execute(check, task, url, &page.body, &meta, auth)
                .await;
            self.stats.increment_checks();

            if !check_result.success {
                success = false;
                self.stats.increment_error(ErrorKind::CheckFailed);
            }
            if let Some(value) = &check_result.extracted_value {
                result.extracted_data.insert(check.name.clone(), value.clone());
            }
            if let (CheckType::DownloadCheck, CheckValue::Path(path)) =
                (check.check_type, &check_result.value)
            {
                result.downloaded_files.push(path.clone());
            }
            result.check_results.insert(check.name.clone(), check_result);
        }
        result.success = success;

        let wants_screenshot = task.generate_report
            || task.checks.iter().any(|c| c.check_type == CheckType::VisualCheck);
        if wants_screenshot {
            if let Some(service) = self.executor.screenshot_service() {
                let name = format!("{}_{}", safe_name(&task.name), safe_url(url));
                match service.capture(url, &name, &CaptureMode::Viewport, auth).await {
                    Ok(path) => {
                        info!("Screenshot captured: {}", path.display());
                        result.screenshot_path = Some(path.display().to_string());
                    }
                    Err(e) => warn!("Failed to capture screenshot for {url}: {e}"),
                }
            }
        }

        if !result.success {
            warn!(
                "Website {url} failed (status {}, failed checks: {:?})",
                page.status,
                result.failed_checks()
            );
        }
        result
    }

    /// Writes the per-website variables derived from `result`.
    pub(super) fn record_website_variables(&self, task: &PatrolTask, result: &PatrolResult) {
        let url = &result.website_url;
        let name = |kind| website_variable_name(kind, &task.name, url);

        self.variables.set(
            &name(WebsiteVariable::Status),
            if result.success { "success" } else { "failed" },
            Some(VariableType::Text),
            &format!("Patrol status: {url}"),
        );
        if let Some(response_time) = result.response_time {
            self.variables.set(
                &name(WebsiteVariable::ResponseTime),
                (response_time * 100.0).round() / 100.0,
                Some(VariableType::Number),
                &format!("Response time in seconds: {url}"),
            );
        }
        if let Some(size) = result.content_size {
            self.variables.set(
                &name(WebsiteVariable::ContentSize),
                size,
                Some(VariableType::Number),
                &format!("Content size in bytes: {url}"),
            );
        }
        if let Some(path) = &result.screenshot_path {
            self.variables.set(
                &name(WebsiteVariable::Screenshot),
                path.as_str(),
                Some(VariableType::Image),
                &format!("Page screenshot: {url}"),
            );
        }
        for (key, value) in &result.extracted_data {
            self.variables.set(
                &data_variable_name(key, &task.name),
                value.as_str(),
                None,
                &format!("Extracted data: {url}"),
            );
        }
    }
}
