//! Monotonic time sources for timer-driven session logic.
//!
//! # Why not call `Instant::now()` directly? (for beginners)
//!
//! The broadcast scheduler fires at 100 ms and 1000 ms intervals and the
//! roster evicts entries after 10 s of silence.  Tests that exercised those
//! rules against the real clock would have to sleep for seconds.  Instead,
//! session code asks a [`Clock`] for the time:
//!
//! - [`SystemClock`] is the real monotonic clock, used in production.
//! - [`ManualClock`] only moves when a test calls [`ManualClock::advance`],
//!   so a ten-second staleness window takes zero wall-clock time to test.
//!
//! # Thread safety
//!
//! `ManualClock` stores its offset in an `AtomicU64` (nanoseconds) so a single
//! clock can be shared by several simulated peers through an `Arc` without a
//! lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A virtual clock that only advances when told to.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tileshare_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now() - start, Duration::from_millis(250));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Total time advanced since construction.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::Relaxed))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
