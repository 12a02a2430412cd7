//! Monotonic time source used by the poll loop.
//!
//! The poller reads time and sleeps only through [`Clock`], so the timing
//! contract can be exercised against virtual time in tests while production
//! callers block on the real clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic clock that can also block the calling thread.
pub trait Clock {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by [`Instant`] and a thread sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use super::Clock;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Virtual clock for tests.
    ///
    /// `sleep` returns immediately after advancing virtual time, so a poll
    /// with a 60 second budget finishes in microseconds. Elapsed time and the
    /// number of non-zero sleeps are observable afterwards.
    #[derive(Debug)]
    pub struct ManualClock {
        origin: Instant,
        offset_nanos: AtomicU64,
        sleeps: AtomicUsize,
    }

    impl ManualClock {
        #[must_use]
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_nanos: AtomicU64::new(0),
                sleeps: AtomicUsize::new(0),
            }
        }

        /// Move virtual time forward without counting a sleep.
        ///
        /// Useful inside a query closure to model a slow query.
        pub fn advance(&self, duration: Duration) {
            let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
            self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
        }

        /// Virtual time elapsed since the clock was created.
        #[must_use]
        pub fn elapsed(&self) -> Duration {
            Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
        }

        /// Number of non-zero sleeps requested so far.
        #[must_use]
        pub fn sleep_count(&self) -> usize {
            self.sleeps.load(Ordering::SeqCst)
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

        fn sleep(&self, duration: Duration) {
            if duration.is_zero() {
                return;
            }
            self.sleeps.fetch_add(1, Ordering::SeqCst);
            self.advance(duration);
        }
    }
}
