//! Monotonic time sources.
//!
//! The scheduler never reads the system clock directly; it asks a [`Clock`].
//! Hosts use [`SystemClock`], tests and the simulator step a [`ManualClock`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of monotonic timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock backed monotonic time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle while
/// the manager owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }

    /// Negative, NaN or out-of-range values advance nothing
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO));
    }

    /// Jump to an absolute instant; ignored if it lies in the past
    pub fn set(&self, instant: Instant) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if instant > *current {
            *current = instant;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared clock handle as stored by the manager and session
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance_secs(2.0);
        clock.set(start);
        assert_eq!(clock.now() - start, Duration::from_secs(2));

        clock.advance_secs(-5.0);
        assert_eq!(clock.now() - start, Duration::from_secs(2));
    }

    #[test]
    fn test_manual_clock_ignores_non_finite_seconds() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.advance_secs(f64::INFINITY);
        clock.advance_secs(f64::NAN);
        assert_eq!(clock.now(), start);

        clock.advance_secs(0.25);
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }
}
