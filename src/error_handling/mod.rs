//! Error handling and patrol statistics.
//!
//! This module provides:
//! - Error type definitions (`PatrolError`, `ScheduleError`, `InitializationError`,
//!   `VariableStoreError`, `XPathError`, `JsonPathError`)
//! - Categorization of transport errors into the patrol taxonomy
//! - Thread-safe statistics counters per error kind

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_reqwest_error, describe_reqwest_error, patrol_error_from_reqwest,
};
pub use stats::PatrolStats;
pub use types::{
    ErrorKind, InitializationError, JsonPathError, PatrolError, ScheduleError,
    VariableStoreError, XPathError,
};
