//! API checks: status assertion plus optional JSON value extraction.

use crate::checks::validation::validate;
use crate::checks::{json_path, ResponseMeta};
use crate::config::{API_SUCCESS_STATUS, MAX_MESSAGE_PREVIEW_CHARS};
use crate::error_handling::PatrolError;
use crate::models::{CheckResult, CheckType, CheckValue, PatrolCheck};
use crate::utils::preview;

/// Succeeds when the status is 200 and, if `expected_value` is set, the
/// extracted value (or the status code when nothing was extracted) validates.
pub(crate) fn run(check: &PatrolCheck, body: &str, meta: &ResponseMeta) -> CheckResult {
    let mut result = CheckResult::new(CheckType::ApiCheck);
    let status = meta.status_code;
    result.value = CheckValue::StatusCode(status);
    result.message = format!("API status code: {status}");
    let mut success = status == API_SUCCESS_STATUS;

    let target = check.target.trim();
    if !target.is_empty() && meta.is_json() {
        match json_path::extract(body, target) {
            Ok(Some(value)) => {
                result.message.push_str(&format!(
                    ", extracted: {}",
                    preview(&value, MAX_MESSAGE_PREVIEW_CHARS)
                ));
                result.extracted_value = Some(value);
            }
            Ok(None) => result
                .message
                .push_str(&format!(", '{target}' not found in response")),
            Err(e) => {
                success = false;
                result
                    .message
                    .push_str(&format!(", {}", PatrolError::from(e)));
            }
        }
    }

    if let Some(expected) = check.expected() {
        let status_text = status.to_string();
        let subject = result.extracted_value.as_deref().unwrap_or(status_text.as_str());
        match validate(subject, expected, check.tolerance) {
            Ok(ok) => {
                success &= ok;
                result.validation_success = Some(ok);
                result.message.push_str(&format!(
                    ", expected '{}': {}",
                    preview(expected, MAX_MESSAGE_PREVIEW_CHARS),
                    if ok { "passed" } else { "failed" }
                ));
            }
            Err(e) => {
                success = false;
                result.message.push_str(&format!(", {e}"));
            }
        }
    }

    result.success = success;
    result
}
