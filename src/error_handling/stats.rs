//! Patrol statistics tracking.
//!
//! Thread-safe counters for every `ErrorKind`, plus totals for websites and
//! checks processed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ErrorKind;

/// Thread-safe patrol statistics tracker.
///
/// All error kinds are initialized to zero on creation, so increments never
/// miss. Shared across executions behind an `Arc`.
pub struct PatrolStats {
    errors: HashMap<ErrorKind, AtomicUsize>,
    websites: AtomicUsize,
    checks: AtomicUsize,
}

impl Default for PatrolStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PatrolStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for kind in ErrorKind::iter() {
            errors.insert(kind, AtomicUsize::new(0));
        }
        PatrolStats {
            errors,
            websites: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn increment_error(&self, kind: ErrorKind) {
        if let Some(counter) = self.errors.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment error counter for {:?} which is not in the map. \
                 This indicates a bug in PatrolStats initialization.",
                kind
            );
        }
    }

    pub fn increment_websites(&self) {
        self.websites.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checks(&self) {
        self.checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_error_count(&self, kind: ErrorKind) -> usize {
        self.errors
            .get(&kind)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn total_errors(&self) -> usize {
        self.errors.values().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn websites_checked(&self) -> usize {
        self.websites.load(Ordering::Relaxed)
    }

    pub fn checks_run(&self) -> usize {
        self.checks.load(Ordering::Relaxed)
    }

    /// Non-zero counters, in `ErrorKind` declaration order.
    pub fn non_zero(&self) -> Vec<(ErrorKind, usize)> {
        ErrorKind::iter()
            .map(|k| (k, self.get_error_count(k)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}
