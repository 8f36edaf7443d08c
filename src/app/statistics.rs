//! Statistics and result output.

use log::{info, warn};
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorKind, PatrolStats};
use crate::models::PatrolResult;

/// Logs one line per website result.
pub fn log_result(result: &PatrolResult) {
    let status = result
        .status_code
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    let time = result
        .response_time
        .map_or_else(|| "-".to_string(), |t| format!("{t:.2}s"));
    if result.success {
        info!(
            "[{}] {} OK (status {status}, {time}, {} checks)",
            result.task_name,
            result.website_url,
            result.check_results.len()
        );
    } else if let Some(error) = &result.error_message {
        warn!("[{}] {} FAILED: {error}", result.task_name, result.website_url);
    } else {
        warn!(
            "[{}] {} FAILED (status {status}, {time}, failed checks: {})",
            result.task_name,
            result.website_url,
            result.failed_checks().join(", ")
        );
    }
}

/// Logs run counters and every non-zero error count.
pub fn print_patrol_statistics(stats: &PatrolStats) {
    info!(
        "Patrol statistics: {} website(s) checked, {} check(s) run",
        stats.websites_checked(),
        stats.checks_run()
    );

    let total_errors = stats.total_errors();
    if total_errors > 0 {
        info!("Error Counts ({} total):", total_errors);
        for kind in ErrorKind::iter() {
            let count = stats.get_error_count(kind);
            if count > 0 {
                info!("   {}: {}", kind.as_str(), count);
            }
        }
    }
}
