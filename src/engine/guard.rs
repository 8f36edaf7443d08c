//! Single-flight guard: at most one execution per task name.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error_handling::PatrolError;

/// Names of tasks with an execution in flight.
#[derive(Debug, Default, Clone)]
pub(crate) struct RunningTasks {
    names: Arc<Mutex<HashSet<String>>>,
}

impl RunningTasks {
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `name` as running until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns `PatrolError::AlreadyRunning` if `name` is already marked.
    pub(crate) fn try_acquire(&self, name: &str) -> Result<RunGuard, PatrolError> {
        if !self.lock().insert(name.to_string()) {
            return Err(PatrolError::AlreadyRunning(name.to_string()));
        }
        Ok(RunGuard {
            names: Arc::clone(&self.names),
            name: name.to_string(),
        })
    }

    pub(crate) fn is_running(&self, name: &str) -> bool {
        self.lock().contains(name)
    }
}

/// Clears the running mark on drop, including when the execution future is
/// cancelled or panics.
#[derive(Debug)]
pub(crate) struct RunGuard {
    names: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}
