//! Text helpers shared by the checks and the engine.

mod sanitize;

pub use sanitize::{preview, sanitize_and_truncate_error_message, sanitize_error_message};
