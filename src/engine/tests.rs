use super::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::models::{AuthConfig, CheckType, PatrolCheck};
use crate::services::CaptureMode;
use crate::variables::VariableValue;

fn engine() -> PatrolEngine {
    PatrolEngine::new(
        Arc::new(reqwest::Client::new()),
        Arc::new(VariableStore::new()),
    )
}

async fn server_with_page(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

fn task_for(name: &str, urls: &[String]) -> PatrolTask {
    let mut task = PatrolTask::new(name, urls.to_vec());
    task.generate_report = false;
    task
}

struct StaticScreenshots;

#[async_trait]
impl ScreenshotService for StaticScreenshots {
    async fn capture(
        &self,
        _url: &str,
        name: &str,
        _mode: &CaptureMode,
        _auth: &AuthContext,
    ) -> Result<PathBuf, PatrolError> {
        Ok(PathBuf::from(format!("/tmp/shots/{name}.png")))
    }
}

struct RejectingAuth;

#[async_trait]
impl AuthProvider for RejectingAuth {
    async fn authenticate(
        &self,
        _auth_type: &str,
        _config: &AuthConfig,
    ) -> Result<AuthContext, PatrolError> {
        Err(PatrolError::AuthFailure("bad credentials".to_string()))
    }
}

#[test]
fn test_add_task_validates_and_schedules() {
    let engine = engine();
    let mut bad = task_for("bad", &["https://example.com".to_string()]);
    bad.start_time = "9am".to_string();
    assert!(matches!(engine.add_task(bad), Err(PatrolError::InvalidTask(_))));

    engine
        .add_task(task_for("good", &["https://example.com".to_string()]))
        .unwrap();
    let task = engine.get_task("good").unwrap();
    assert!(task.next_run.unwrap() > Local::now().naive_local());
    assert_eq!(engine.state("good"), Some(TaskState::Idle));
    assert_eq!(engine.state("missing"), None);
}

#[test]
fn test_registry_operations() {
    let engine = engine();
    engine
        .add_task(task_for("b", &["https://b.example".to_string()]))
        .unwrap();
    engine
        .add_task(task_for("a", &["https://a.example".to_string()]))
        .unwrap();
    let names: Vec<String> = engine.list_tasks().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["a", "b"]);

    engine.set_enabled("a", false).unwrap();
    assert!(!engine.get_task("a").unwrap().enabled);
    assert!(matches!(
        engine.set_enabled("zzz", true),
        Err(PatrolError::NotFound(_))
    ));

    assert_eq!(engine.remove_task("b").unwrap().name, "b");
    assert!(matches!(engine.remove_task("b"), Err(PatrolError::NotFound(_))));
}

#[test]
fn test_due_tasks_skips_disabled_and_future() {
    let engine = engine();
    engine
        .add_task(task_for("a", &["https://a.example".to_string()]))
        .unwrap();
    engine
        .add_task(task_for("b", &["https://b.example".to_string()]))
        .unwrap();
    let now = Local::now().naive_local();
    assert!(engine.due_tasks(now).is_empty());

    let far = now + chrono::Duration::days(400);
    assert_eq!(engine.due_tasks(far), vec!["a", "b"]);
    engine.set_enabled("b", false).unwrap();
    assert_eq!(engine.due_tasks(far), vec!["a"]);
}

#[test]
fn test_claim_due_tasks_claims_each_due_time_once() {
    let engine = engine();
    engine
        .add_task(task_for("a", &["https://a.example".to_string()]))
        .unwrap();
    let now = Local::now().naive_local();
    engine
        .set_next_run("a", Some(now - chrono::Duration::minutes(1)))
        .unwrap();

    assert_eq!(engine.claim_due_tasks(now), vec!["a"]);
    assert!(engine.get_task("a").unwrap().next_run.unwrap() > now);
    // A second tick before the spawned run starts finds nothing due
    assert!(engine.claim_due_tasks(now).is_empty());
    assert!(engine.due_tasks(now).is_empty());
}

#[test]
fn test_claim_due_tasks_skips_running_tasks() {
    let engine = engine();
    engine
        .add_task(task_for("busy", &["https://a.example".to_string()]))
        .unwrap();
    let now = Local::now().naive_local();
    engine
        .set_next_run("busy", Some(now - chrono::Duration::minutes(1)))
        .unwrap();

    let _guard = engine.running.try_acquire("busy").unwrap();
    assert!(engine.claim_due_tasks(now).is_empty());
    assert_eq!(engine.due_tasks(now), vec!["busy"]);
}

#[tokio::test]
async fn test_execute_unknown_and_disabled() {
    let engine = engine();
    assert!(matches!(
        engine.execute("nope").await,
        Err(PatrolError::NotFound(_))
    ));
    assert_eq!(engine.stats().get_error_count(ErrorKind::NotFound), 1);

    let mut task = task_for("off", &["https://example.com".to_string()]);
    task.enabled = false;
    engine.add_task(task).unwrap();
    assert!(engine.execute("off").await.unwrap().is_empty());
    assert!(engine.run_history("off").is_empty());
}

#[tokio::test]
async fn test_execute_updates_bookkeeping_and_variables() {
    let server = server_with_page("<html><title>Status Board</title></html>").await;
    let engine = engine();
    let task = task_for("Board", &[format!("{}/", server.uri())]).with_check(
        PatrolCheck::new("title", CheckType::ContentCheck, "title"),
    );
    engine.add_task(task).unwrap();

    let results = engine.execute("Board").await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(
        results[0].extracted_data.get("title").map(String::as_str),
        Some("Status Board")
    );

    let task = engine.get_task("Board").unwrap();
    assert_eq!(task.run_count, 1);
    assert!(task.last_run.is_some());
    assert_eq!(engine.state("Board"), Some(TaskState::Idle));

    let history = engine.run_history("Board");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, crate::models::RunOutcome::Succeeded);

    let vars = engine.variables();
    for prefix in ["patrol_time", "patrol_time_formatted", "patrol_date", "patrol_datetime"] {
        assert!(vars.contains(&format!("{prefix}_Board")), "{prefix}");
    }
    let url_part = crate::variables::safe_url(&results[0].website_url);
    assert_eq!(
        vars.get(&format!("status_Board_{url_part}")),
        Some(VariableValue::from("success"))
    );
    assert!(vars.contains(&format!("response_time_Board_{url_part}")));
    assert_eq!(
        vars.get(&format!("content_size_Board_{url_part}")),
        Some(VariableValue::Integer(
            "<html><title>Status Board</title></html>".len() as i64
        ))
    );
    assert_eq!(
        vars.get("data_title_Board"),
        Some(VariableValue::from("Status Board"))
    );
    assert_eq!(
        vars.get("extracted_title_Board"),
        Some(VariableValue::from("Status Board"))
    );

    assert_eq!(engine.stats().websites_checked(), 1);
    assert_eq!(engine.stats().checks_run(), 1);
}

#[tokio::test]
async fn test_concurrent_execute_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    let engine = engine();
    engine
        .add_task(task_for("slow", &[server.uri()]))
        .unwrap();

    let (first, second) = tokio::join!(engine.execute("slow"), engine.execute("slow"));
    assert_eq!(first.unwrap().len(), 1);
    assert_eq!(
        second.unwrap_err(),
        PatrolError::AlreadyRunning("slow".to_string())
    );
    assert_eq!(engine.run_history("slow").len(), 1);

    // The guard is released once the first run finishes
    assert_eq!(engine.execute("slow").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_removed_task_run_completes_against_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    let engine = engine();
    engine
        .add_task(task_for("temp", &[server.uri(), server.uri()]))
        .unwrap();

    let remove = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.state("temp"), Some(TaskState::Running));
        engine.remove_task("temp").unwrap();
        // Still running although unregistered
        assert_eq!(engine.state("temp"), Some(TaskState::Running));
    };
    let (results, ()) = tokio::join!(engine.execute("temp"), remove);
    assert_eq!(results.unwrap().len(), 2);
    assert!(engine.get_task("temp").is_none());
    assert_eq!(engine.state("temp"), None);
}

#[tokio::test]
async fn test_run_history_is_bounded() {
    let server = server_with_page("ok").await;
    let engine = engine();
    engine
        .add_task(task_for("often", &[format!("{}/", server.uri())]))
        .unwrap();
    for _ in 0..MAX_RUN_HISTORY + 3 {
        engine.execute("often").await.unwrap();
    }
    assert_eq!(engine.run_history("often").len(), MAX_RUN_HISTORY);
    assert_eq!(
        engine.get_task("often").unwrap().run_count,
        (MAX_RUN_HISTORY + 3) as u64
    );
}

#[tokio::test]
async fn test_observer_errors_and_panics_are_contained() {
    let server = server_with_page("ok").await;
    let engine = engine();
    engine
        .add_task(task_for("obs", &[format!("{}/", server.uri())]))
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    engine.add_observer(|_: &PatrolResult| -> anyhow::Result<()> { anyhow::bail!("sink down") });
    engine.add_observer(|_: &PatrolResult| -> anyhow::Result<()> { panic!("observer bug") });
    let counter = Arc::clone(&calls);
    engine.add_observer(move |_: &PatrolResult| -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let results = engine.execute("obs").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.stats().get_error_count(ErrorKind::ObserverError), 2);
}

#[tokio::test]
async fn test_auth_failure_continues_without_credentials() {
    let server = server_with_page("public").await;
    let engine = engine().with_auth_provider(Arc::new(RejectingAuth));
    let mut task = task_for("auth", &[format!("{}/", server.uri())]);
    task.auth_config = Some(AuthConfig::new("basic"));
    engine.add_task(task).unwrap();

    let results = engine.execute("auth").await.unwrap();
    assert!(results[0].success);
    assert_eq!(engine.stats().get_error_count(ErrorKind::AuthFailure), 1);
}

#[tokio::test]
async fn test_auth_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    struct Bearer;
    #[async_trait]
    impl AuthProvider for Bearer {
        async fn authenticate(
            &self,
            _auth_type: &str,
            config: &AuthConfig,
        ) -> Result<AuthContext, PatrolError> {
            let mut ctx = AuthContext::default();
            ctx.headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", config.param("token").unwrap_or_default()),
            );
            Ok(ctx)
        }
    }

    let engine = engine().with_auth_provider(Arc::new(Bearer));
    let mut task = task_for("api", &[server.uri()]);
    task.auth_config = Some(AuthConfig::new("bearer").with_param("token", "t0k"));
    engine.add_task(task).unwrap();

    let results = engine.execute("api").await.unwrap();
    assert_eq!(results[0].status_code, Some(200));
}

#[tokio::test]
async fn test_page_screenshot_when_reporting() {
    let server = server_with_page("ok").await;
    let engine = engine().with_screenshot_service(Arc::new(StaticScreenshots));
    let mut task = task_for("Shots", &[format!("{}/", server.uri())]);
    task.generate_report = true;
    engine.add_task(task).unwrap();

    let results = engine.execute("Shots").await.unwrap();
    let shot = results[0].screenshot_path.clone().unwrap();
    assert!(shot.ends_with(".png"));

    let url_part = crate::variables::safe_url(&results[0].website_url);
    let var = engine
        .variables()
        .get_with_metadata(&format!("screenshot_Shots_{url_part}"))
        .unwrap();
    assert_eq!(var.var_type, VariableType::Image);
}

#[tokio::test]
async fn test_associated_url_limits_checks() {
    let server = server_with_page("<h1>Hi</h1>").await;
    let first = format!("{}/", server.uri());
    let engine = engine();
    let task = task_for("bound", &[first.clone()])
        .with_check(PatrolCheck::new("here", CheckType::ContentCheck, "h1").for_url(first.clone()))
        .with_check(
            PatrolCheck::new("elsewhere", CheckType::ContentCheck, "h2")
                .for_url("https://other.example/"),
        );
    engine.add_task(task).unwrap();

    let results = engine.execute("bound").await.unwrap();
    assert!(results[0].success);
    assert!(results[0].check_results.contains_key("here"));
    assert!(!results[0].check_results.contains_key("elsewhere"));
}
