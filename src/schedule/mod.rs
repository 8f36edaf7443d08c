//! Next-run computation for patrol tasks.
//!
//! Everything here is pure: given a task and `now`, the result is fully
//! determined. The scheduler loop and the engine consult it; nothing in this
//! module reads the clock.

mod calculator;
mod time;

pub use calculator::{next_run, CustomSchedule, ScheduleCalculator};
pub use time::parse_time_of_day;
