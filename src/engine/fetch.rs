//! Timed page fetch.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::error_handling::{patrol_error_from_reqwest, PatrolError};
use crate::services::AuthContext;

/// A fetched page: status, content type and decoded body.
#[derive(Debug, Clone)]
pub(crate) struct FetchedPage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// GETs `url` with the auth headers and cookies applied.
///
/// `timeout` bounds the whole exchange, body included.
///
/// # Errors
///
/// Returns `PatrolError::NetworkTimeout` or `PatrolError::NetworkError`.
pub(crate) async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    auth: &AuthContext,
) -> Result<FetchedPage, PatrolError> {
    let to_patrol_error = |e: reqwest::Error| patrol_error_from_reqwest(&e, url, timeout.as_secs());

    let response = auth
        .apply(client.get(url).timeout(timeout))
        .send()
        .await
        .map_err(to_patrol_error)?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.map_err(to_patrol_error)?;

    Ok(FetchedPage {
        status,
        content_type,
        body,
    })
}
