//! site_patrol library: scheduled website patrols
//!
//! Patrol tasks bundle websites, checks (content, API, visual, download) and a
//! frequency policy. The [`PatrolEngine`] fetches each website, runs the
//! applicable checks, streams a [`PatrolResult`] per website to observers and
//! records report variables in a shared [`VariableStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use site_patrol::{CheckType, PatrolCheck, PatrolEngine, PatrolTask, Tolerance, VariableStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let variables = Arc::new(VariableStore::new());
//! let engine = PatrolEngine::new(Arc::new(reqwest::Client::new()), Arc::clone(&variables));
//!
//! let task = PatrolTask::new("homepage", vec!["https://example.com".to_string()]).with_check(
//!     PatrolCheck::new("title", CheckType::ContentCheck, "title")
//!         .with_expected("Example", Tolerance::Contains),
//! );
//! engine.add_task(task)?;
//!
//! let results = engine.execute("homepage").await?;
//! println!("{} website(s) patrolled", results.len());
//! println!("{}", variables.substitute("Title: ${extracted_title_homepage}"));
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

mod app;
pub mod checks;
pub mod config;
pub mod engine;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod schedule;
pub mod scheduler;
pub mod services;
mod utils;
pub mod variables;

// Re-export public API
pub use app::load_tasks;
pub use checks::{CheckExecutor, ResponseMeta};
pub use config::{Config, LogFormat, LogLevel};
pub use engine::PatrolEngine;
pub use error_handling::{ErrorKind, PatrolError, PatrolStats, ScheduleError};
pub use models::{
    AuthConfig, CheckResult, CheckType, CheckValue, Frequency, PatrolCheck, PatrolResult,
    PatrolTask, RunOutcome, RunSummary, TaskState, Tolerance,
};
pub use run::{run_patrol, PatrolReport};
pub use schedule::{next_run, CustomSchedule, ScheduleCalculator};
pub use scheduler::run_scheduler;
pub use services::{
    AuthContext, AuthProvider, CaptureMode, ChannelObserver, CredentialAuthProvider, Downloader,
    HttpDownloader, ResultObserver, ScreenshotService,
};
pub use variables::{Variable, VariableStore, VariableType, VariableValue};

// Internal run module (wires the engine up from a Config)
mod run {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use log::{info, warn};
    use tokio_util::sync::CancellationToken;

    use crate::app::{load_tasks, log_result, print_patrol_statistics, shutdown_gracefully};
    use crate::config::Config;
    use crate::engine::PatrolEngine;
    use crate::error_handling::PatrolError;
    use crate::initialization::init_client;
    use crate::models::PatrolResult;
    use crate::scheduler::run_scheduler;
    use crate::services::{CredentialAuthProvider, HttpDownloader};
    use crate::variables::VariableStore;

    /// Outcome of a [`run_patrol`] invocation.
    #[derive(Debug, Clone)]
    pub struct PatrolReport {
        /// Number of task executions that produced results
        pub tasks_run: usize,
        /// Websites patrolled across all executions
        pub websites: usize,
        /// Websites whose result was successful
        pub succeeded: usize,
        /// Websites whose result failed
        pub failed: usize,
        /// Variables in the store when the run ended
        pub variables: usize,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    impl PatrolReport {
        fn tally(&mut self, results: &[PatrolResult]) {
            self.tasks_run += 1;
            self.websites += results.len();
            let ok = results.iter().filter(|r| r.success).count();
            self.succeeded += ok;
            self.failed += results.len() - ok;
        }
    }

    /// Loads the task file named by `config` and patrols.
    ///
    /// With `config.task` set, runs that task once; with `config.once`, runs
    /// every enabled task once in name order. Otherwise schedules tasks until
    /// Ctrl-C.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built, the task file cannot be
    /// loaded, a task is invalid, or the requested task does not exist.
    pub async fn run_patrol(config: Config) -> Result<PatrolReport> {
        let start = Instant::now();
        let client = init_client(&config).context("Failed to initialize HTTP client")?;
        let auth = CredentialAuthProvider::new(&config)
            .context("Failed to initialize authentication client")?;
        let variables = Arc::new(VariableStore::new());
        let engine = Arc::new(
            PatrolEngine::new(Arc::clone(&client), Arc::clone(&variables))
                .with_auth_provider(Arc::new(auth))
                .with_downloader(Arc::new(HttpDownloader::new(
                    Arc::clone(&client),
                    config.download_dir.clone(),
                ))),
        );
        engine.add_observer(|result: &PatrolResult| -> anyhow::Result<()> {
            log_result(result);
            Ok(())
        });

        for task in load_tasks(&config.tasks)? {
            let name = task.name.clone();
            engine
                .add_task(task)
                .with_context(|| format!("Invalid patrol task '{name}'"))?;
        }

        let mut report = PatrolReport {
            tasks_run: 0,
            websites: 0,
            succeeded: 0,
            failed: 0,
            variables: 0,
            elapsed_seconds: 0.0,
        };

        if let Some(name) = &config.task {
            let results = engine
                .execute(name)
                .await
                .with_context(|| format!("Failed to execute patrol task '{name}'"))?;
            report.tally(&results);
        } else if config.once {
            for task in engine.list_tasks().into_iter().filter(|t| t.enabled) {
                match engine.execute(&task.name).await {
                    Ok(results) => report.tally(&results),
                    Err(e @ PatrolError::NotFound(_)) => warn!("{e}"),
                    Err(e) => return Err(e).context("Patrol run failed"),
                }
            }
        } else {
            let cancel = CancellationToken::new();
            let scheduler = tokio::spawn(run_scheduler(
                Arc::clone(&engine),
                Duration::from_secs(config.tick_seconds.max(1)),
                cancel.clone(),
            ));
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Received Ctrl-C, shutting down");
            shutdown_gracefully(cancel, Some(scheduler)).await;
            for task in engine.list_tasks() {
                for run in engine.run_history(&task.name) {
                    report.tasks_run += 1;
                    report.websites += run.websites;
                    report.succeeded += run.succeeded;
                    report.failed += run.failed;
                }
            }
        }

        print_patrol_statistics(engine.stats());
        report.variables = variables.len();
        report.elapsed_seconds = start.elapsed().as_secs_f64();
        Ok(report)
    }
}
