//! Retry policy: how often to attempt and when to give up.

use crate::error::PolicyError;
use std::time::Duration;

/// Default spacing between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default wall-clock budget for a presence poll.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What to do when less than one interval of budget remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalAttempt {
    /// Attempts happen only at whole multiples of the interval. The trailing
    /// partial interval is never used, so a time-bounded poll makes exactly
    /// `1 + floor(timeout / interval)` attempts.
    #[default]
    OnSchedule,
    /// Make one extra attempt at the deadline when a partial interval remains.
    UseRemainder,
}

/// Bounds for a poll: a fixed interval plus an attempt count, a wall-clock
/// timeout, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    max_attempts: Option<u32>,
    timeout: Option<Duration>,
    final_attempt: FinalAttempt,
}

impl RetryPolicy {
    /// Time-bounded policy.
    ///
    /// A `timeout` shorter than `interval` evaluates the predicate once.
    pub fn timed(interval: Duration, timeout: Duration) -> Result<Self, PolicyError> {
        Self::build(interval, None, Some(timeout))
    }

    /// Attempt-bounded policy (retry-on-error style).
    pub fn attempts(max_attempts: u32, interval: Duration) -> Result<Self, PolicyError> {
        Self::build(interval, Some(max_attempts), None)
    }

    /// Policy bounded by whichever of attempt count or timeout runs out first.
    pub fn bounded(
        interval: Duration,
        max_attempts: u32,
        timeout: Duration,
    ) -> Result<Self, PolicyError> {
        Self::build(interval, Some(max_attempts), Some(timeout))
    }

    fn build(
        interval: Duration,
        max_attempts: Option<u32>,
        timeout: Option<Duration>,
    ) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        if max_attempts == Some(0) {
            return Err(PolicyError::ZeroAttempts);
        }

        Ok(Self {
            interval,
            max_attempts,
            timeout,
            final_attempt: FinalAttempt::default(),
        })
    }

    /// Choose how the trailing partial interval is handled.
    #[must_use]
    pub fn with_final_attempt(mut self, final_attempt: FinalAttempt) -> Self {
        self.final_attempt = final_attempt;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn final_attempt(&self) -> FinalAttempt {
        self.final_attempt
    }

    /// Upper bound on attempts when every query returns instantly.
    ///
    /// For a time bound this is `1 + floor(timeout / interval)` (plus one in
    /// [`FinalAttempt::UseRemainder`] mode when the division leaves a
    /// remainder), capped by `max_attempts`.
    pub fn scheduled_attempts(&self) -> u64 {
        let by_time = self.timeout.map(|timeout| {
            let whole = timeout.as_nanos() / self.interval.as_nanos();
            let partial = timeout.as_nanos() % self.interval.as_nanos() != 0;
            let extra = u128::from(partial && self.final_attempt == FinalAttempt::UseRemainder);
            u64::try_from(1 + whole + extra).unwrap_or(u64::MAX)
        });
        let by_count = self.max_attempts.map(u64::from);

        match (by_time, by_count) {
            (Some(t), Some(c)) => t.min(c),
            (Some(t), None) => t,
            (None, Some(c)) => c,
            (None, None) => u64::MAX,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: None,
            timeout: Some(DEFAULT_TIMEOUT),
            final_attempt: FinalAttempt::OnSchedule,
        }
    }
}
