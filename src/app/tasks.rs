//! Task file loading.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use crate::models::PatrolTask;

/// A task file is either a bare array of tasks or `{"tasks": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    List(Vec<PatrolTask>),
    Wrapped { tasks: Vec<PatrolTask> },
}

/// Reads patrol task definitions from a JSON file.
///
/// Tasks are returned as written; validation happens when they are added to
/// the engine.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid task list.
pub fn load_tasks(path: &Path) -> Result<Vec<PatrolTask>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    let file: TaskFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse task file {}", path.display()))?;
    let tasks = match file {
        TaskFile::List(tasks) | TaskFile::Wrapped { tasks } => tasks,
    };
    info!("Loaded {} patrol task(s) from {}", tasks.len(), path.display());
    Ok(tasks)
}
