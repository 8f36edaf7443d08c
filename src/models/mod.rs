//! Data model for patrol tasks, checks and their results.
//!
//! Tasks and checks deserialize from the JSON task file; results serialize
//! for report and notification consumers.

mod check;
mod result;
mod task;

pub use check::{CheckType, PatrolCheck, Tolerance};
pub use result::{CheckResult, CheckValue, PatrolResult, RunOutcome, RunSummary, TaskState};
pub use task::{AuthConfig, Frequency, PatrolTask};
