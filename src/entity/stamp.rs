//! VersionStamp - Totally ordered version identity
//!
//! Every successful write produces a new stamp. Stamps define a strict total
//! order per entity: the committed version with the largest stamp is the
//! current one, and optimistic concurrency compares stamps, never content.
//!
//! Stamp zero is reserved as "unassigned" and is rejected by the validation
//! contract wherever a version is required. `VersionClock` never issues it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A totally ordered, opaque version identity.
///
/// No Default implementation exists: a stamp is either issued by a
/// `VersionClock` or reconstructed from a stored record, never conjured.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct VersionStamp(u64);

impl VersionStamp {
    /// Reconstructs a stamp from its stored value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    ///
    /// Exists for serialization and logging; application code should not
    /// depend on the internal representation.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns false for the reserved "unassigned" stamp.
    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly increasing version stamps.
///
/// Stamps are seeded from wall-clock microseconds but never move backwards,
/// even if the wall clock does: each call returns at least one more than the
/// previous call. Uniqueness of (entity, stamp) across processes is enforced
/// by the store's conditional insert, not by the clock.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    /// Creates a clock with no issued stamps.
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Returns the next stamp, strictly greater than any previously issued.
    pub fn next(&self) -> VersionStamp {
        let now = Utc::now().timestamp_micros().max(1) as u64;
        loop {
            let last = self.last.load(Ordering::SeqCst);
            let candidate = last.max(now - 1) + 1;
            if self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return VersionStamp::new(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_total_order() {
        let s1 = VersionStamp::new(1);
        let s5 = VersionStamp::new(5);
        let s10 = VersionStamp::new(10);

        assert!(s1 < s5);
        assert!(s5 < s10);
        assert!(s1 < s10);
    }

    #[test]
    fn test_stamp_zero_is_unassigned() {
        assert!(!VersionStamp::new(0).is_assigned());
        assert!(VersionStamp::new(1).is_assigned());
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let clock = VersionClock::new();
        let mut previous = clock.next();

        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_clock_never_issues_unassigned() {
        let clock = VersionClock::new();
        assert!(clock.next().is_assigned());
    }

    #[test]
    fn test_clock_is_safe_across_threads() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let clock = Arc::new(VersionClock::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let clock = Arc::clone(&clock);
            handles.push(std::thread::spawn(move || {
                (0..250).map(|_| clock.next().value()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().expect("clock thread panicked") {
                assert!(seen.insert(value), "duplicate stamp {}", value);
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
