//! Frequency policies.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error_handling::ScheduleError;
use crate::models::{Frequency, PatrolTask};
use crate::schedule::time::parse_time_of_day;

/// Evaluates `custom_schedule` expressions (e.g. a cron evaluator).
///
/// Returns `None` when the expression cannot be interpreted.
pub trait CustomSchedule: Send + Sync {
    fn next_after(&self, expression: &str, now: NaiveDateTime) -> Option<NaiveDateTime>;
}

/// Computes when a task should next run.
///
/// Custom schedules are delegated to an optional evaluator. Without one, a
/// custom task runs on its daily `start_time`; with one, an expression the
/// evaluator rejects is an error rather than a silent fallback.
#[derive(Clone, Default)]
pub struct ScheduleCalculator {
    custom: Option<Arc<dyn CustomSchedule>>,
}

impl std::fmt::Debug for ScheduleCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleCalculator")
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl ScheduleCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_evaluator(evaluator: Arc<dyn CustomSchedule>) -> Self {
        Self {
            custom: Some(evaluator),
        }
    }

    /// Whether custom schedules are interpreted or fall back to daily.
    pub fn has_custom_evaluator(&self) -> bool {
        self.custom.is_some()
    }

    /// The next instant strictly after `now` at which `task` should run.
    ///
    /// # Errors
    ///
    /// - `InvalidTime` if `start_time` or an entry of `multiple_times` is not `HH:MM`
    /// - `MissingTimes` for `multiple_daily` without times
    /// - `InvalidCustomSchedule` if the custom evaluator rejects the expression
    pub fn next_run(
        &self,
        task: &PatrolTask,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, ScheduleError> {
        match task.frequency {
            Frequency::Daily => Ok(next_daily(parse_time_of_day(&task.start_time)?, now)),
            Frequency::MultipleDaily => next_multiple_daily(&task.multiple_times, now),
            Frequency::Weekly => Ok(next_weekly(parse_time_of_day(&task.start_time)?, now)),
            Frequency::Monthly => Ok(next_monthly(parse_time_of_day(&task.start_time)?, now)),
            Frequency::Custom => {
                let expression = task
                    .custom_schedule
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty());
                match (expression, &self.custom) {
                    (Some(expr), Some(evaluator)) => evaluator
                        .next_after(expr, now)
                        .filter(|next| *next > now)
                        .ok_or_else(|| ScheduleError::InvalidCustomSchedule(expr.to_string())),
                    _ => Ok(next_daily(parse_time_of_day(&task.start_time)?, now)),
                }
            }
        }
    }
}

/// `ScheduleCalculator::next_run` without a custom evaluator.
pub fn next_run(task: &PatrolTask, now: NaiveDateTime) -> Result<NaiveDateTime, ScheduleError> {
    ScheduleCalculator::default().next_run(task, now)
}

fn next_daily(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

fn next_multiple_daily(
    times: &[String],
    now: NaiveDateTime,
) -> Result<NaiveDateTime, ScheduleError> {
    let mut parsed = times
        .iter()
        .map(|t| parse_time_of_day(t))
        .collect::<Result<Vec<_>, _>>()?;
    parsed.sort();

    let earliest = *parsed.first().ok_or(ScheduleError::MissingTimes)?;
    let today = now.date();
    Ok(parsed
        .iter()
        .map(|t| today.and_time(*t))
        .find(|candidate| *candidate > now)
        .unwrap_or_else(|| (today + Duration::days(1)).and_time(earliest)))
}

fn next_weekly(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let since_monday = i64::from(now.weekday().num_days_from_monday());
    let days_ahead = (7 - since_monday) % 7;
    let candidate = (now.date() + Duration::days(days_ahead)).and_time(at);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

fn next_monthly(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    // Day 1 exists in every month
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(now.date());
    first.and_time(at)
}
