//! The poll loop.
//!
//! Attempt `k` is scheduled at `start + k * interval` on a monotonic clock,
//! and the deadline `start + timeout` is computed once. Attempt 0 runs
//! immediately, so a condition that is already true costs no sleep.
//!
//! After an unsatisfied attempt the loop stops when the attempt bound is
//! reached, when the next slot would fall after the deadline, or when the
//! clock has already passed the deadline (a slow query). With fast queries a
//! time-bounded poll therefore makes exactly `1 + floor(timeout / interval)`
//! attempts.

use crate::clock::{Clock, SystemClock};
use crate::observation::PollResult;
use crate::policy::{FinalAttempt, RetryPolicy};
use std::convert::Infallible;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs poll loops on the caller's thread against a [`Clock`].
#[derive(Debug, Clone, Default)]
pub struct Poller<C = SystemClock> {
    clock: C,
}

impl Poller<SystemClock> {
    /// Poller that blocks on the real clock.
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> Poller<C> {
    /// Poller driven by an injected clock.
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Poll `query` until `predicate` holds or the policy is exhausted.
    pub fn poll<T, Q, P>(&self, policy: &RetryPolicy, query: Q, mut predicate: P) -> PollResult<T>
    where
        Q: FnMut() -> T,
        P: FnMut(&T) -> bool,
    {
        match self.try_poll(policy, query, |obs| Ok::<_, Infallible>(predicate(obs))) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Like [`Poller::poll`], but the predicate may reject an observation it
    /// cannot interpret.
    ///
    /// A predicate error ends the poll at once and is returned to the caller.
    /// Retrying cannot repair an observation the predicate fails to parse.
    pub fn try_poll<T, E, Q, P>(
        &self,
        policy: &RetryPolicy,
        mut query: Q,
        mut predicate: P,
    ) -> Result<PollResult<T>, E>
    where
        Q: FnMut() -> T,
        P: FnMut(&T) -> Result<bool, E>,
    {
        let start = self.clock.now();
        let deadline = policy.timeout().and_then(|t| start.checked_add(t));
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            let observation = query();

            if predicate(&observation)? {
                debug!(
                    target: "poller",
                    attempt,
                    elapsed_ms = self.clock.now().saturating_duration_since(start).as_millis(),
                    "Condition satisfied"
                );
                return Ok(PollResult::Found(observation));
            }

            debug!(target: "poller", attempt, "Condition not yet satisfied");

            let Some(wake_at) = self.next_wake(policy, start, deadline, attempt) else {
                break;
            };

            let now = self.clock.now();
            self.clock.sleep(wake_at.saturating_duration_since(now));
        }

        warn!(
            target: "poller",
            attempts = attempt,
            elapsed_ms = self.clock.now().saturating_duration_since(start).as_millis(),
            interval_ms = policy.interval().as_millis(),
            timeout_ms = policy.timeout().map(|t| t.as_millis()),
            "Condition not satisfied before the retry budget ran out"
        );
        Ok(PollResult::NotFound)
    }

    /// When the next attempt should start, or `None` if the budget is spent.
    fn next_wake(
        &self,
        policy: &RetryPolicy,
        start: Instant,
        deadline: Option<Instant>,
        attempts_made: u32,
    ) -> Option<Instant> {
        if policy.max_attempts().is_some_and(|max| attempts_made >= max) {
            return None;
        }

        let next_slot = start.checked_add(policy.interval().checked_mul(attempts_made)?)?;

        let Some(deadline) = deadline else {
            return Some(next_slot);
        };

        let now = self.clock.now();
        if now >= deadline {
            return None;
        }
        if next_slot <= deadline {
            return Some(next_slot);
        }

        match policy.final_attempt() {
            FinalAttempt::OnSchedule => None,
            FinalAttempt::UseRemainder => Some(deadline),
        }
    }
}
