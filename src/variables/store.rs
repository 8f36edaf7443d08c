//! Thread-safe variable store.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error_handling::VariableStoreError;
use crate::variables::value::{Variable, VariableType, VariableValue};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is a valid regex")
});

/// Counts of stored variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSummary {
    pub total: usize,
    pub by_type: BTreeMap<VariableType, usize>,
    pub names: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ExportDocument {
    variables: Vec<Variable>,
    exported_at: NaiveDateTime,
}

/// Name → variable map shared by the engine, check executor and report consumers.
///
/// Every write takes the lock once, so readers observe either the old or the
/// new variable, never a partial update. Variables are only removed by
/// [`delete`](Self::delete) or [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct VariableStore {
    variables: RwLock<HashMap<String, Variable>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Variable>> {
        self.variables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Variable>> {
        self.variables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates or overwrites a variable.
    ///
    /// `var_type` of `None` means "auto": the type is inferred from the value
    /// (see [`VariableType::infer`]). Overwriting keeps the original
    /// `created_at` and refreshes `updated_at`.
    pub fn set(
        &self,
        name: &str,
        value: impl Into<VariableValue>,
        var_type: Option<VariableType>,
        description: &str,
    ) {
        let value = value.into();
        let var_type = var_type.unwrap_or_else(|| VariableType::infer(&value));
        let now = Local::now().naive_local();
        debug!("Set variable '{name}' = '{value}' (type: {var_type})");

        let mut vars = self.write();
        let created_at = vars.get(name).map_or(now, |existing| existing.created_at);
        vars.insert(
            name.to_string(),
            Variable {
                name: name.to_string(),
                value,
                var_type,
                description: description.to_string(),
                created_at,
                updated_at: now,
            },
        );
    }

    /// `set` with an inferred type and no description.
    pub fn set_auto(&self, name: &str, value: impl Into<VariableValue>) {
        self.set(name, value, None, "");
    }

    pub fn get(&self, name: &str) -> Option<VariableValue> {
        self.read().get(name).map(|v| v.value.clone())
    }

    /// The value of `name`, or `default` when unset.
    pub fn get_or(&self, name: &str, default: impl Into<VariableValue>) -> VariableValue {
        self.get(name).unwrap_or_else(|| default.into())
    }

    pub fn get_with_metadata(&self, name: &str) -> Option<Variable> {
        self.read().get(name).cloned()
    }

    /// Snapshot of every value, ordered by name.
    pub fn get_all(&self) -> BTreeMap<String, VariableValue> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    /// Snapshot of every variable with metadata, ordered by name.
    pub fn get_all_with_metadata(&self) -> Vec<Variable> {
        let mut all: Vec<Variable> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Replaces the value of an existing variable, keeping its type and
    /// description. Creates an auto-typed variable when `name` is unset.
    pub fn update(&self, name: &str, value: impl Into<VariableValue>) {
        let value = value.into();
        {
            let mut vars = self.write();
            if let Some(existing) = vars.get_mut(name) {
                debug!("Updated variable '{name}' = '{value}'");
                existing.value = value;
                existing.updated_at = Local::now().naive_local();
                return;
            }
        }
        warn!("Variable '{name}' does not exist, creating new one");
        self.set_auto(name, value);
    }

    pub fn delete(&self, name: &str) -> bool {
        let removed = self.write().remove(name).is_some();
        if removed {
            debug!("Deleted variable '{name}'");
        }
        removed
    }

    pub fn clear(&self) {
        self.write().clear();
        info!("Cleared all variables");
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn by_type(&self, var_type: VariableType) -> BTreeMap<String, VariableValue> {
        self.read()
            .values()
            .filter(|v| v.var_type == var_type)
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect()
    }

    /// Screenshots and other image paths.
    pub fn images(&self) -> BTreeMap<String, VariableValue> {
        self.by_type(VariableType::Image)
    }

    /// Downloaded files and other file paths.
    pub fn files(&self) -> BTreeMap<String, VariableValue> {
        self.by_type(VariableType::File)
    }

    pub fn summary(&self) -> VariableSummary {
        let vars = self.read();
        let mut by_type = BTreeMap::new();
        for v in vars.values() {
            *by_type.entry(v.var_type).or_insert(0) += 1;
        }
        let mut names: Vec<String> = vars.keys().cloned().collect();
        names.sort();
        VariableSummary {
            total: vars.len(),
            by_type,
            names,
        }
    }

    /// Replaces every `${name}` whose variable exists with its value.
    ///
    /// Unknown placeholders are left verbatim. A single pass over one
    /// snapshot: values containing `${...}` are not expanded again.
    pub fn substitute(&self, text: &str) -> String {
        let vars = self.read();
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| match vars.get(&caps[1]) {
                Some(var) => var.value.to_string(),
                None => {
                    debug!("Variable '{}' not found, keeping placeholder", &caps[1]);
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Writes every variable with metadata to `path` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `VariableStoreError` if serialization or the write fails.
    pub fn export_json(&self, path: &Path) -> Result<(), VariableStoreError> {
        let doc = ExportDocument {
            variables: self.get_all_with_metadata(),
            exported_at: Local::now().naive_local(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        info!(
            "Exported {} variables to {}",
            doc.variables.len(),
            path.display()
        );
        Ok(())
    }

    /// Loads variables previously written by [`export_json`](Self::export_json).
    ///
    /// Existing names are skipped unless `overwrite` is set. Returns the
    /// number of variables imported.
    ///
    /// # Errors
    ///
    /// Returns `VariableStoreError` if the file cannot be read or parsed; the
    /// store is left untouched in that case.
    pub fn import_json(&self, path: &Path, overwrite: bool) -> Result<usize, VariableStoreError> {
        let doc: ExportDocument = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let mut imported = 0;
        let mut vars = self.write();
        for var in doc.variables {
            if !overwrite && vars.contains_key(&var.name) {
                warn!("Variable '{}' already exists, skipping", var.name);
                continue;
            }
            vars.insert(var.name.clone(), var);
            imported += 1;
        }
        drop(vars);
        info!("Imported {imported} variables from {}", path.display());
        Ok(imported)
    }
}
