//! Binary-facing helpers: task file loading, shutdown handling and
//! statistics output.

pub mod shutdown;
pub mod statistics;
pub mod tasks;

// Re-export public API
pub use shutdown::shutdown_gracefully;
pub use statistics::{log_result, print_patrol_statistics};
pub use tasks::load_tasks;
