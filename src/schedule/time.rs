//! Time-of-day parsing.

use chrono::NaiveTime;

use crate::error_handling::ScheduleError;

/// Parses an `HH:MM` time of day (a single-digit hour is accepted).
///
/// # Errors
///
/// Returns `ScheduleError::InvalidTime` for anything else, including
/// out-of-range hours or minutes.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ScheduleError> {
    let invalid = || ScheduleError::InvalidTime(value.to_string());
    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}
