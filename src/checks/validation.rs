//! Expected-value validation.

use regex::Regex;

use crate::error_handling::PatrolError;
use crate::models::Tolerance;

/// Compares `actual` with `expected` under `tolerance`.
///
/// # Errors
///
/// Returns `PatrolError::ValidationError` when `tolerance` is `Regex` and
/// `expected` is not a valid pattern.
pub fn validate(actual: &str, expected: &str, tolerance: Tolerance) -> Result<bool, PatrolError> {
    match tolerance {
        Tolerance::Exact => Ok(actual == expected),
        Tolerance::Contains => Ok(actual.contains(expected)),
        Tolerance::Regex => Regex::new(expected)
            .map(|re| re.is_match(actual))
            .map_err(|e| PatrolError::ValidationError(format!("invalid regex '{expected}': {e}"))),
    }
}
