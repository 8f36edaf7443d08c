//! Timer loop driving scheduled task execution.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{debug, error, info, warn};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::engine::PatrolEngine;
use crate::error_handling::PatrolError;

/// Every `tick`, claims the enabled tasks that are due and spawns an
/// execution for each.
///
/// Each execution runs on its own tokio task, so slow tasks never delay
/// others. Returns after `cancel` fires and in-flight executions finish.
pub async fn run_scheduler(engine: Arc<PatrolEngine>, tick: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: JoinSet<()> = JoinSet::new();
    info!("Scheduler started (tick every {}s)", tick.as_secs());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let now = Local::now().naive_local();
                for name in engine.claim_due_tasks(now) {
                    let engine = Arc::clone(&engine);
                    in_flight.spawn(async move {
                        match engine.execute(&name).await {
                            Ok(results) => debug!("Scheduled run of {name} produced {} results", results.len()),
                            Err(PatrolError::AlreadyRunning(_)) => {
                                debug!("Skipping {name}: previous run still in progress");
                            }
                            Err(e) => warn!("Scheduled run of {name} failed: {e}"),
                        }
                    });
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Patrol execution panicked: {e}");
                }
            }
        }
    }

    if !in_flight.is_empty() {
        info!("Scheduler stopping, waiting for {} running task(s)", in_flight.len());
    }
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Patrol execution panicked: {e}");
        }
    }
    info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatrolTask;
    use crate::variables::VariableStore;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let engine = Arc::new(PatrolEngine::new(
            Arc::new(reqwest::Client::new()),
            Arc::new(VariableStore::new()),
        ));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(
            Arc::clone(&engine),
            Duration::from_millis(20),
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_runs_due_task_once_per_schedule() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let engine = Arc::new(PatrolEngine::new(
            Arc::new(reqwest::Client::new()),
            Arc::new(VariableStore::new()),
        ));
        let mut task = PatrolTask::new("due", vec![server.uri()]);
        task.generate_report = false;
        engine.add_task(task).unwrap();
        // Make the task due; execution reschedules it into the future
        let past = Local::now().naive_local() - chrono::Duration::minutes(1);
        engine.set_next_run("due", Some(past)).unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(
            Arc::clone(&engine),
            Duration::from_millis(20),
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(engine.get_task("due").unwrap().run_count, 1);
        assert_eq!(engine.run_history("due").len(), 1);
    }
}
