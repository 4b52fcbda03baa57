//! Clock collaborator used by schedulers for due-time checks and sleeping.

use std::thread;
use std::time::{Duration, Instant};

/// Source of monotonic time and blocking sleep.
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
    /// Block the calling thread for `dur`.
    fn sleep(&self, dur: Duration);
}

/// Clock backed by `std::time::Instant` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, dur: Duration) {
        thread::sleep(dur);
    }
}

/// Convert a positive, finite number of seconds into a `Duration`.
///
/// Returns `None` for zero, negative, NaN or infinite input.
#[must_use]
pub fn secs_to_duration(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(0.5), Some(Duration::from_millis(500)));
        assert_eq!(secs_to_duration(0.0), None);
        assert_eq!(secs_to_duration(-1.0), None);
        assert_eq!(secs_to_duration(f64::NAN), None);
        assert_eq!(secs_to_duration(f64::INFINITY), None);
    }

    #[test]
    fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now().duration_since(start) >= Duration::from_millis(5));
    }
}
