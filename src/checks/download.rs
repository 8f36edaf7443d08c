//! Download checks: fetch a file through the downloader.

use std::path::PathBuf;

use log::warn;

use crate::models::{CheckResult, CheckType, CheckValue, PatrolCheck, PatrolTask};
use crate::services::Downloader;

/// Where a successful download landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DownloadInfo {
    pub path: PathBuf,
    pub size: Option<u64>,
    pub file_name: Option<String>,
}

/// Resolves a possibly relative download target against the page URL.
fn download_url(target: &str, page_url: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    match url::Url::parse(target) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => url::Url::parse(page_url)
            .and_then(|base| base.join(target))
            .ok()
            .map(|u| u.to_string()),
    }
}

pub(crate) async fn run(
    downloader: Option<&dyn Downloader>,
    check: &PatrolCheck,
    task: &PatrolTask,
    page_url: &str,
) -> (CheckResult, Option<DownloadInfo>) {
    let Some(downloader) = downloader else {
        return (
            CheckResult::failed(CheckType::DownloadCheck, "downloader not configured"),
            None,
        );
    };
    let Some(url) = download_url(&check.target, page_url) else {
        return (
            CheckResult::failed(
                CheckType::DownloadCheck,
                format!("invalid download target '{}'", check.target),
            ),
            None,
        );
    };

    match downloader.download(&url, &task.name).await {
        Ok(path) => {
            let size = tokio::fs::metadata(&path).await.ok().map(|m| m.len());
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());

            let mut result = CheckResult::new(CheckType::DownloadCheck);
            result.success = true;
            result.value = CheckValue::Path(path.display().to_string());
            result.message = match size {
                Some(size) => format!("Downloaded {url} to {} ({size} bytes)", path.display()),
                None => format!("Downloaded {url} to {}", path.display()),
            };
            (
                result,
                Some(DownloadInfo {
                    path,
                    size,
                    file_name,
                }),
            )
        }
        Err(e) => {
            warn!("Download for check '{}' failed: {e}", check.name);
            (
                CheckResult::failed(CheckType::DownloadCheck, format!("Download failed: {e}")),
                None,
            )
        }
    }
}
