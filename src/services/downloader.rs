//! HTTP file downloader.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use log::{error, info};
use tokio::io::AsyncWriteExt;

use crate::config::MAX_DOWNLOAD_SIZE;
use crate::error_handling::{describe_reqwest_error, PatrolError};
use crate::services::traits::Downloader;
use crate::variables::safe_name;

/// Built-in [`Downloader`] streaming files into a local directory.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Arc<reqwest::Client>,
    download_dir: PathBuf,
    max_size: u64,
}

fn download_error(message: String) -> PatrolError {
    PatrolError::CheckExecutionError {
        check: "download".to_string(),
        message,
    }
}

impl HttpDownloader {
    pub fn new(client: Arc<reqwest::Client>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
            max_size: MAX_DOWNLOAD_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// File name for a download of `url`.
    ///
    /// The last path segment when it has an extension, otherwise
    /// `<name>_download_<YYYYmmdd_HHMMSS>.bin`.
    pub fn file_name_for(url: &str, name: &str, now: NaiveDateTime) -> String {
        let from_path = url::Url::parse(url).ok().and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        });
        match from_path {
            Some(segment) if segment.contains('.') => sanitize_file_name(&segment),
            _ => format!(
                "{}_download_{}.bin",
                safe_name(name),
                now.format("%Y%m%d_%H%M%S")
            ),
        }
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64, PatrolError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PatrolError::NetworkError(describe_reqwest_error(&e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PatrolError::NetworkError(format!(
                "HTTP {} downloading {url}",
                status.as_u16()
            )));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_size {
                return Err(download_error(format!(
                    "file too large: {len} bytes > {} bytes",
                    self.max_size
                )));
            }
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| download_error(format!("cannot create {}: {e}", path.display())))?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PatrolError::NetworkError(describe_reqwest_error(&e)))?
        {
            written += chunk.len() as u64;
            if written > self.max_size {
                return Err(download_error(format!(
                    "file too large during download: {written} bytes > {} bytes",
                    self.max_size
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| download_error(format!("write to {} failed: {e}", path.display())))?;
        }
        file.flush()
            .await
            .map_err(|e| download_error(format!("write to {} failed: {e}", path.display())))?;
        Ok(written)
    }
}

/// Keeps `[A-Za-z0-9._-]`, replacing everything else with `_`.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, name: &str) -> Result<PathBuf, PatrolError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                download_error(format!(
                    "cannot create {}: {e}",
                    self.download_dir.display()
                ))
            })?;

        let path = self
            .download_dir
            .join(Self::file_name_for(url, name, Local::now().naive_local()));

        // Stream into a sibling `.part` file so a failed download never
        // touches an earlier file with the same name.
        let partial = partial_path(&path);
        let outcome = match self.fetch_to(url, &partial).await {
            Ok(size) => tokio::fs::rename(&partial, &path)
                .await
                .map(|()| size)
                .map_err(|e| download_error(format!("cannot move into {}: {e}", path.display()))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(size) => {
                info!("Downloaded file: {} ({size} bytes)", path.display());
                Ok(path)
            }
            Err(e) => {
                error!("Failed to download {url}: {e}");
                // Absent when the request failed before any byte was written
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
