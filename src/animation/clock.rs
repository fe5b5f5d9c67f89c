//! Monotonic clock shared by everything that animates.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Shareable clock that can be driven manually.
///
/// A real clock measures time since its creation. Setting the time switches it into manual mode,
/// which is how tests get deterministic frame deltas.
#[derive(Debug, Clone)]
pub struct Clock {
    inner: Rc<RefCell<ClockInner>>,
}

#[derive(Debug)]
struct ClockInner {
    origin: Instant,
    manual: Option<Duration>,
}

impl Clock {
    /// Creates a clock stuck at the given time until it is advanced manually.
    pub fn with_time(time: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ClockInner {
                origin: Instant::now(),
                manual: Some(time),
            })),
        }
    }

    pub fn now(&self) -> Duration {
        let inner = self.inner.borrow();
        inner.manual.unwrap_or_else(|| inner.origin.elapsed())
    }

    pub fn set_time(&self, time: Duration) {
        self.inner.borrow_mut().manual = Some(time);
    }

    /// Moves a manual clock forward. A real clock becomes manual at its current reading.
    pub fn advance(&self, by: Duration) {
        let now = self.now();
        self.set_time(now + by);
    }

    pub fn is_manual(&self) -> bool {
        self.inner.borrow().manual.is_some()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ClockInner {
                origin: Instant::now(),
                manual: None,
            })),
        }
    }
}

impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = Clock::with_time(Duration::from_millis(5));
        assert!(clock.is_manual());
        clock.advance(Duration::from_millis(3));
        assert_eq!(clock.now(), Duration::from_millis(8));
    }

    #[test]
    fn clones_share_time() {
        let clock = Clock::with_time(Duration::ZERO);
        let other = clock.clone();
        other.set_time(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
        assert_eq!(clock, other);
        assert_ne!(clock, Clock::with_time(Duration::ZERO));
    }
}
