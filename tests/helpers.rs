// Shared test helpers for mock websites and engine setup.

use std::sync::Arc;

use site_patrol::{PatrolEngine, PatrolTask, VariableStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates an engine with a fresh variable store and a plain client.
#[allow(dead_code)] // Used by other test files
pub fn create_engine() -> (Arc<PatrolEngine>, Arc<VariableStore>) {
    let variables = Arc::new(VariableStore::new());
    let engine = PatrolEngine::new(Arc::new(reqwest::Client::new()), Arc::clone(&variables));
    (Arc::new(engine), variables)
}

/// Starts a mock server answering `GET route` with `status` and `body`.
#[allow(dead_code)]
pub async fn mock_site(route: &str, status: u16, content_type: &str, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_raw(body.to_string(), content_type),
        )
        .mount(&server)
        .await;
    server
}

/// A task with report screenshots off, so no screenshot service is needed.
#[allow(dead_code)]
pub fn quiet_task(name: &str, websites: Vec<String>) -> PatrolTask {
    let mut task = PatrolTask::new(name, websites);
    task.generate_report = false;
    task
}
