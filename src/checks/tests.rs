use super::*;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error_handling::PatrolError;
use crate::models::Tolerance;
use crate::services::CaptureMode;
use crate::variables::VariableValue;

struct FakeScreenshots {
    calls: Mutex<Vec<(String, String, CaptureMode)>>,
}

#[async_trait]
impl ScreenshotService for FakeScreenshots {
    async fn capture(
        &self,
        url: &str,
        name: &str,
        mode: &CaptureMode,
        _auth: &AuthContext,
    ) -> Result<PathBuf, PatrolError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), name.to_string(), mode.clone()));
        Ok(PathBuf::from(format!("/tmp/shots/{name}.png")))
    }
}

struct FailingDownloader;

#[async_trait]
impl Downloader for FailingDownloader {
    async fn download(&self, url: &str, _name: &str) -> Result<PathBuf, PatrolError> {
        Err(PatrolError::NetworkError(format!("HTTP 404 downloading {url}")))
    }
}

struct FileDownloader {
    dir: tempfile::TempDir,
}

#[async_trait]
impl Downloader for FileDownloader {
    async fn download(&self, _url: &str, _name: &str) -> Result<PathBuf, PatrolError> {
        let path = self.dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        Ok(path)
    }
}

fn task() -> PatrolTask {
    PatrolTask::new("Daily Check", vec!["https://example.com".to_string()])
}

fn html_meta() -> ResponseMeta {
    ResponseMeta {
        status_code: 200,
        content_type: Some("text/html".to_string()),
        response_time: 0.1,
        content_size: 64,
    }
}

fn executor() -> CheckExecutor {
    CheckExecutor::new(Arc::new(VariableStore::new()))
}

#[tokio::test]
async fn test_content_check_writes_variables() {
    let exec = executor();
    let check = PatrolCheck::new("page-title", CheckType::ContentCheck, "title")
        .with_expected("Example", Tolerance::Contains);
    let body = "<html><head><title>Example Domain</title></head></html>";

    let result = exec
        .execute(&check, &task(), "https://example.com", body, &html_meta(), &AuthContext::default())
        .await;
    assert!(result.success);

    let vars = exec.variables();
    assert_eq!(
        vars.get("extracted_pagetitle_DailyCheck"),
        Some(VariableValue::from("Example Domain"))
    );
    assert_eq!(
        vars.get("status_pagetitle_DailyCheck"),
        Some(VariableValue::from("success"))
    );
    assert!(vars.contains("timestamp_pagetitle_DailyCheck"));
}

#[tokio::test]
async fn test_api_check_writes_status_and_response() {
    let exec = executor();
    let check = PatrolCheck::new("health", CheckType::ApiCheck, "status");
    let meta = ResponseMeta {
        content_type: Some("application/json".to_string()),
        ..html_meta()
    };
    let result = exec
        .execute(&check, &task(), "https://example.com", r#"{"status":"up"}"#, &meta, &AuthContext::default())
        .await;
    assert!(result.success);

    let vars = exec.variables();
    assert_eq!(vars.get("api_status_health_DailyCheck"), Some(VariableValue::Integer(200)));
    assert_eq!(vars.get("api_response_health_DailyCheck"), Some(VariableValue::from("up")));
    assert_eq!(vars.get("extracted_health_DailyCheck"), Some(VariableValue::from("up")));
}

#[tokio::test]
async fn test_failed_check_status_variable() {
    let exec = executor();
    let check = PatrolCheck::new("missing", CheckType::ContentCheck, "#nope");
    let result = exec
        .execute(&check, &task(), "https://example.com", "<p>hi</p>", &html_meta(), &AuthContext::default())
        .await;
    assert!(!result.success);
    assert_eq!(
        exec.variables().get("status_missing_DailyCheck"),
        Some(VariableValue::from("failed"))
    );
    assert!(!exec.variables().contains("extracted_missing_DailyCheck"));
}

#[tokio::test]
async fn test_form_check_is_a_documented_failure() {
    let exec = executor();
    let check = PatrolCheck::new("login-form", CheckType::FormCheck, "form#login");
    let result = exec
        .execute(&check, &task(), "https://example.com", "", &html_meta(), &AuthContext::default())
        .await;
    assert!(!result.success);
    assert_eq!(result.message, "form checks are not implemented");
}

#[tokio::test]
async fn test_visual_check_without_service_fails() {
    let exec = executor();
    let check = PatrolCheck::new("hero", CheckType::VisualCheck, "full");
    let result = exec
        .execute(&check, &task(), "https://example.com", "", &html_meta(), &AuthContext::default())
        .await;
    assert!(!result.success);
    assert!(result.message.contains("not configured"));
}

#[tokio::test]
async fn test_visual_check_uses_mode_and_records_image() {
    let shots = Arc::new(FakeScreenshots {
        calls: Mutex::new(Vec::new()),
    });
    let exec = executor().with_screenshot_service(shots.clone());
    let check = PatrolCheck::new("hero", CheckType::VisualCheck, "#hero");
    let result = exec
        .execute(&check, &task(), "https://example.com", "", &html_meta(), &AuthContext::default())
        .await;
    assert!(result.success);
    assert_eq!(
        result.value,
        CheckValue::Path("/tmp/shots/DailyCheck_hero.png".to_string())
    );

    let calls = shots.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].2, CaptureMode::Element("#hero".to_string()));

    let var = exec.variables().get_with_metadata("visual_hero_DailyCheck").unwrap();
    assert_eq!(var.var_type, VariableType::Image);
}

#[tokio::test]
async fn test_download_check_records_metadata() {
    let downloader = Arc::new(FileDownloader {
        dir: tempfile::TempDir::new().unwrap(),
    });
    let exec = executor().with_downloader(downloader);
    let check = PatrolCheck::new("report", CheckType::DownloadCheck, "/files/report.pdf");
    let result = exec
        .execute(&check, &task(), "https://example.com", "", &html_meta(), &AuthContext::default())
        .await;
    assert!(result.success);

    let vars = exec.variables();
    assert_eq!(vars.get("download_size_report_DailyCheck"), Some(VariableValue::Integer(8)));
    assert_eq!(
        vars.get("download_name_report_DailyCheck"),
        Some(VariableValue::from("report.pdf"))
    );
    assert_eq!(
        vars.get_with_metadata("download_path_report_DailyCheck").unwrap().var_type,
        VariableType::File
    );
}

#[tokio::test]
async fn test_download_failure_is_captured() {
    let exec = executor().with_downloader(Arc::new(FailingDownloader));
    let check = PatrolCheck::new("report", CheckType::DownloadCheck, "https://example.com/x.zip");
    let result = exec
        .execute(&check, &task(), "https://example.com", "", &html_meta(), &AuthContext::default())
        .await;
    assert!(!result.success);
    assert!(result.message.contains("404"));
    assert!(!exec.variables().contains("download_path_report_DailyCheck"));
}

#[test]
fn test_response_meta_is_json() {
    let mut meta = html_meta();
    assert!(!meta.is_json());
    meta.content_type = Some("Application/JSON".to_string());
    assert!(meta.is_json());
    meta.content_type = None;
    assert!(!meta.is_json());
}
