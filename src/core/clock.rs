//! Commit timestamps.
//!
//! Creation times double as the default sort key, so they must be strictly
//! increasing within a store even when the wall clock stalls or steps back.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of wall-clock milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Wraps a [`Clock`] so successive stamps strictly increase
pub struct MonotonicStamp {
    clock: Box<dyn Clock>,
    last: Option<i64>,
}

impl std::fmt::Debug for MonotonicStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicStamp")
            .field("last", &self.last)
            .finish()
    }
}

impl Default for MonotonicStamp {
    fn default() -> Self {
        Self::new(Box::new(SystemClock))
    }
}

impl MonotonicStamp {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self { clock, last: None }
    }

    /// Next stamp: the clock reading, bumped past the previous stamp if needed
    pub fn next(&mut self) -> i64 {
        let now = self.clock.now_millis();
        let stamp = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_stamps_strictly_increase_on_stalled_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut stamp = MonotonicStamp::new(Box::new(clock.clone()));

        assert_eq!(stamp.next(), 1_000);
        assert_eq!(stamp.next(), 1_001);
        assert_eq!(stamp.next(), 1_002);

        clock.set(5_000);
        assert_eq!(stamp.next(), 5_000);
    }

    #[test]
    fn test_clock_stepping_back() {
        let clock = Arc::new(ManualClock::new(10_000));
        let mut stamp = MonotonicStamp::new(Box::new(clock.clone()));

        assert_eq!(stamp.next(), 10_000);
        clock.set(9_000);
        assert_eq!(stamp.next(), 10_001);
    }
}
