//! The patrol engine.
//!
//! Owns the task registry, runs tasks website by website, and fans results
//! out to observers. Executions of one task never overlap; different tasks
//! run independently.

mod fetch;
mod guard;
mod website;

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{Local, NaiveDateTime};
use log::{debug, error, info, warn};

use crate::checks::CheckExecutor;
use crate::config::{LONG_DATETIME_FORMAT, MAX_RUN_HISTORY};
use crate::error_handling::{ErrorKind, PatrolError, PatrolStats};
use crate::models::{Frequency, PatrolResult, PatrolTask, RunSummary, TaskState};
use crate::schedule::ScheduleCalculator;
use crate::services::{AuthContext, AuthProvider, Downloader, ResultObserver, ScreenshotService};
use crate::variables::{run_variable_name, RunVariable, VariableStore, VariableType};

use guard::RunningTasks;

/// Schedules and executes patrol tasks.
pub struct PatrolEngine {
    client: Arc<reqwest::Client>,
    variables: Arc<VariableStore>,
    executor: CheckExecutor,
    auth: Option<Arc<dyn AuthProvider>>,
    schedule: ScheduleCalculator,
    tasks: RwLock<HashMap<String, PatrolTask>>,
    running: RunningTasks,
    observers: RwLock<Vec<Arc<dyn ResultObserver>>>,
    history: Mutex<HashMap<String, VecDeque<RunSummary>>>,
    stats: Arc<PatrolStats>,
}

impl std::fmt::Debug for PatrolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatrolEngine")
            .field("tasks", &self.task_names())
            .field("executor", &self.executor)
            .field("auth", &self.auth.is_some())
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

impl PatrolEngine {
    pub fn new(client: Arc<reqwest::Client>, variables: Arc<VariableStore>) -> Self {
        Self {
            client,
            executor: CheckExecutor::new(Arc::clone(&variables)),
            variables,
            auth: None,
            schedule: ScheduleCalculator::new(),
            tasks: RwLock::new(HashMap::new()),
            running: RunningTasks::default(),
            observers: RwLock::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            stats: Arc::new(PatrolStats::new()),
        }
    }

    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    pub fn with_screenshot_service(mut self, service: Arc<dyn ScreenshotService>) -> Self {
        self.executor = self.executor.with_screenshot_service(service);
        self
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.executor = self.executor.with_downloader(downloader);
        self
    }

    pub fn with_schedule_calculator(mut self, schedule: ScheduleCalculator) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    pub fn stats(&self) -> &Arc<PatrolStats> {
        &self.stats
    }

    /// Registers an observer called once per website result, in website order.
    pub fn add_observer(&self, observer: impl ResultObserver + 'static) {
        self.add_observer_arc(Arc::new(observer));
    }

    pub fn add_observer_arc(&self, observer: Arc<dyn ResultObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    fn read_tasks(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, PatrolTask>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tasks(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, PatrolTask>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_tasks().keys().cloned().collect();
        names.sort();
        names
    }

    /// Validates and registers `task`, replacing any task with the same name.
    ///
    /// `next_run` is computed from the current time.
    ///
    /// # Errors
    ///
    /// Returns `PatrolError::InvalidTask` if validation or scheduling fails.
    pub fn add_task(&self, mut task: PatrolTask) -> Result<(), PatrolError> {
        task.validate()?;
        if task.frequency == Frequency::Custom && !self.schedule.has_custom_evaluator() {
            warn!(
                "Task '{}' uses custom schedule '{}' but no evaluator is configured, running daily at {}",
                task.name,
                task.custom_schedule.as_deref().unwrap_or_default(),
                task.start_time
            );
        }
        task.next_run = Some(self.schedule.next_run(&task, Local::now().naive_local())?);

        let name = task.name.clone();
        let next_run = task.next_run;
        let replaced = self.write_tasks().insert(name.clone(), task).is_some();
        if replaced {
            info!("Updated patrol task: {name}");
        } else {
            info!("Added patrol task: {name}");
        }
        debug!("Next run of {name}: {next_run:?}");
        Ok(())
    }

    /// Unregisters a task. An execution already in flight finishes against
    /// its own snapshot of the task.
    ///
    /// # Errors
    ///
    /// Returns `PatrolError::NotFound` if no such task is registered.
    pub fn remove_task(&self, name: &str) -> Result<PatrolTask, PatrolError> {
        let removed = self
            .write_tasks()
            .remove(name)
            .ok_or_else(|| PatrolError::NotFound(name.to_string()))?;
        info!("Removed patrol task: {name}");
        Ok(removed)
    }

    pub fn get_task(&self, name: &str) -> Option<PatrolTask> {
        self.read_tasks().get(name).cloned()
    }

    /// Every registered task, ordered by name.
    pub fn list_tasks(&self) -> Vec<PatrolTask> {
        let mut tasks: Vec<PatrolTask> = self.read_tasks().values().cloned().collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        tasks
    }

    /// Enables or disables future runs; a run in flight is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns `PatrolError::NotFound` if no such task is registered.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), PatrolError> {
        let mut tasks = self.write_tasks();
        let task = tasks
            .get_mut(name)
            .ok_or_else(|| PatrolError::NotFound(name.to_string()))?;
        task.enabled = enabled;
        info!(
            "{} patrol task: {name}",
            if enabled { "Enabled" } else { "Disabled" }
        );
        Ok(())
    }

    /// Overrides when `name` next becomes due; `None` unschedules it.
    ///
    /// # Errors
    ///
    /// Returns `PatrolError::NotFound` if no such task is registered.
    pub fn set_next_run(&self, name: &str, at: Option<NaiveDateTime>) -> Result<(), PatrolError> {
        let mut tasks = self.write_tasks();
        let task = tasks
            .get_mut(name)
            .ok_or_else(|| PatrolError::NotFound(name.to_string()))?;
        task.next_run = at;
        debug!("Next run of {name} set to {at:?}");
        Ok(())
    }

    /// `Running` while an execution is in flight (even if the task was removed
    /// meanwhile), `Idle` for other registered tasks, `None` otherwise.
    pub fn state(&self, name: &str) -> Option<TaskState> {
        if self.running.is_running(name) {
            Some(TaskState::Running)
        } else if self.read_tasks().contains_key(name) {
            Some(TaskState::Idle)
        } else {
            None
        }
    }

    /// Enabled tasks whose `next_run` is at or before `now`, ordered by name.
    pub fn due_tasks(&self, now: NaiveDateTime) -> Vec<String> {
        let mut due: Vec<String> = self
            .read_tasks()
            .values()
            .filter(|t| t.enabled && t.next_run.is_some_and(|next| next <= now))
            .map(|t| t.name.clone())
            .collect();
        due.sort();
        due
    }

    /// Takes every due task for execution, advancing its `next_run` past
    /// `now` under the registry lock.
    ///
    /// A task is claimed at most once per due time, so two scheduler ticks
    /// racing ahead of a slow spawn never both start it. Tasks with an
    /// execution in flight are left for a later tick.
    pub fn claim_due_tasks(&self, now: NaiveDateTime) -> Vec<String> {
        let mut tasks = self.write_tasks();
        let mut claimed = Vec::new();
        for task in tasks.values_mut() {
            let due = task.enabled && task.next_run.is_some_and(|next| next <= now);
            if !due || self.running.is_running(&task.name) {
                continue;
            }
            task.next_run = match self.schedule.next_run(task, now) {
                Ok(next) => Some(next),
                Err(e) => {
                    error!("Cannot schedule next run of {}: {e}", task.name);
                    None
                }
            };
            claimed.push(task.name.clone());
        }
        claimed.sort();
        claimed
    }

    /// Completed runs of `name`, oldest first.
    pub fn run_history(&self, name: &str) -> Vec<RunSummary> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|runs| runs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Runs `name` once against every website, in order.
    ///
    /// Returns one result per website, or an empty list when the task is
    /// disabled. Per-website and per-check failures are captured in the
    /// results and never abort the run.
    ///
    /// # Errors
    ///
    /// * `PatrolError::NotFound` - no such task
    /// * `PatrolError::AlreadyRunning` - an execution of `name` is in flight
    pub async fn execute(&self, name: &str) -> Result<Vec<PatrolResult>, PatrolError> {
        let task = self.get_task(name).ok_or_else(|| {
            self.stats.increment_error(ErrorKind::NotFound);
            PatrolError::NotFound(name.to_string())
        })?;
        if !task.enabled {
            info!("Patrol task disabled: {name}");
            return Ok(Vec::new());
        }
        let _guard = self.running.try_acquire(name).inspect_err(|_| {
            self.stats.increment_error(ErrorKind::AlreadyRunning);
        })?;

        let started_at = Local::now().naive_local();
        self.schedule_next(&task, started_at);
        info!(
            "Executing patrol task: {name} ({} websites, {} checks)",
            task.websites.len(),
            task.checks.len()
        );

        self.record_run_variables(&task, started_at);
        let auth = self.acquire_auth(&task).await;

        let mut results = Vec::with_capacity(task.websites.len());
        for url in &task.websites {
            let result = self.patrol_website(&task, url, &auth).await;
            self.record_website_variables(&task, &result);
            self.notify(&result);
            results.push(result);
        }

        self.finish_run(&task, started_at, &results);
        Ok(results)
    }

    fn schedule_next(&self, task: &PatrolTask, now: NaiveDateTime) {
        let next = match self.schedule.next_run(task, now) {
            Ok(next) => Some(next),
            Err(e) => {
                error!("Cannot schedule next run of {}: {e}", task.name);
                None
            }
        };
        if let Some(registered) = self.write_tasks().get_mut(&task.name) {
            registered.next_run = next;
        }
    }

    fn record_run_variables(&self, task: &PatrolTask, at: NaiveDateTime) {
        let entries = [
            (RunVariable::Time, at.format("%H:%M:%S").to_string(), "Patrol time"),
            (
                RunVariable::TimeFormatted,
                at.format(LONG_DATETIME_FORMAT).to_string(),
                "Patrol time (long form)",
            ),
            (RunVariable::Date, at.format("%Y-%m-%d").to_string(), "Patrol date"),
            (
                RunVariable::DateTime,
                at.format("%Y-%m-%d %H:%M:%S").to_string(),
                "Patrol date and time",
            ),
        ];
        for (kind, value, description) in entries {
            self.variables.set(
                &run_variable_name(kind, &task.name),
                value,
                Some(VariableType::Text),
                &format!("{description}: {}", task.name),
            );
        }
    }

    async fn acquire_auth(&self, task: &PatrolTask) -> AuthContext {
        let Some(config) = task.active_auth() else {
            return AuthContext::default();
        };
        let Some(provider) = &self.auth else {
            warn!(
                "Task '{}' requires {} auth but no auth provider is configured",
                task.name, config.auth_type
            );
            self.stats.increment_error(ErrorKind::AuthFailure);
            return AuthContext::default();
        };
        match provider.authenticate(&config.auth_type, config).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Authentication failed for task '{}': {e}", task.name);
                self.stats.increment_error(ErrorKind::AuthFailure);
                AuthContext::default()
            }
        }
    }

    fn notify(&self, result: &PatrolResult) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_result(result))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Error in result observer: {e:#}");
                    self.stats.increment_error(ErrorKind::ObserverError);
                }
                Err(_) => {
                    error!("Result observer panicked on {}", result.website_url);
                    self.stats.increment_error(ErrorKind::ObserverError);
                }
            }
        }
    }

    fn finish_run(&self, task: &PatrolTask, started_at: NaiveDateTime, results: &[PatrolResult]) {
        let summary = RunSummary::from_results(&task.name, started_at, results);

        if let Some(registered) = self.write_tasks().get_mut(&task.name) {
            registered.last_run = Some(summary.finished_at);
            registered.run_count += 1;
        }

        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            let runs = history.entry(task.name.clone()).or_default();
            if runs.len() == MAX_RUN_HISTORY {
                runs.pop_front();
            }
            runs.push_back(summary.clone());
        }

        info!(
            "Completed patrol task: {}, {}/{} websites succeeded",
            task.name, summary.succeeded, summary.websites
        );
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
