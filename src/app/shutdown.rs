//! Graceful shutdown handling.

use log::error;
use tokio_util::sync::CancellationToken;

/// Stops the scheduler and waits for in-flight executions to finish.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    scheduler: Option<tokio::task::JoinHandle<()>>,
) {
    cancel.cancel();
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.await {
            error!("Scheduler task failed: {e}");
        }
    }
}
