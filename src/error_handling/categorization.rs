//! Error categorization.
//!
//! Maps transport errors from `reqwest` onto the patrol error taxonomy.

use super::types::{ErrorKind, PatrolError};

/// Categorizes a `reqwest::Error` into an `ErrorKind`.
///
/// Timeouts become `NetworkTimeout`; everything else the client can raise
/// (connect, redirect, body, decode) is a `NetworkError`.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::NetworkTimeout
    } else {
        ErrorKind::NetworkError
    }
}

/// Converts a `reqwest::Error` raised while fetching `url` into a `PatrolError`.
///
/// # Arguments
///
/// * `error` - The transport error
/// * `url` - The URL being fetched (for the timeout message)
/// * `timeout_secs` - The timeout that applied to the request
pub fn patrol_error_from_reqwest(
    error: &reqwest::Error,
    url: &str,
    timeout_secs: u64,
) -> PatrolError {
    match categorize_reqwest_error(error) {
        ErrorKind::NetworkTimeout => PatrolError::NetworkTimeout {
            url: url.to_string(),
            timeout_secs,
        },
        _ => PatrolError::NetworkError(describe_reqwest_error(error)),
    }
}

/// Renders a `reqwest::Error` with its source chain.
///
/// reqwest's own `Display` stops at "error sending request for url"; the
/// useful part (connection refused, DNS failure) lives in the sources.
pub fn describe_reqwest_error(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_error_is_network_error() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("client");
        // Port 9 on localhost is discard; nothing listens there in test environments
        let err = client
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("request should fail");
        let patrol = patrol_error_from_reqwest(&err, "http://127.0.0.1:9/", 2);
        match patrol {
            PatrolError::NetworkError(msg) => assert!(!msg.is_empty()),
            PatrolError::NetworkTimeout { .. } => {} // slow CI sandboxes may time out instead
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schedule_error_converts_to_invalid_task() {
        let e: PatrolError = crate::error_handling::ScheduleError::MissingTimes.into();
        assert_eq!(e.kind(), ErrorKind::InvalidTask);
    }
}
