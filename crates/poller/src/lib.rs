//! Polling with a timeout for eventually consistent state.
//!
//! A [`Poller`] repeatedly calls a caller-supplied query at a fixed interval
//! until a predicate accepts the observation or the [`RetryPolicy`] runs out,
//! then reports [`PollResult::Found`] or [`PollResult::NotFound`]. Running out
//! of budget is not an error; deciding whether absence should fail a test is
//! up to the caller.
//!
//! The loop runs on the caller's thread and blocks between attempts. Queries
//! should not fail: a transient failure is reported as
//! [`Observation::Failed`] so it counts as "not yet true".
//!
//! # Example
//!
//! ```
//! use poller::{Observation, PollResult, Poller, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::timed(Duration::from_millis(1), Duration::from_millis(5))?;
//! let result = Poller::new().poll(
//!     &policy,
//!     || Observation::Present("Running"),
//!     |obs| obs.present() == Some(&"Running"),
//! );
//! assert_eq!(result, PollResult::Found(Observation::Present("Running")));
//! # Ok::<(), poller::PolicyError>(())
//! ```

pub mod clock;
pub mod error;
pub mod observation;
pub mod policy;
pub mod poller;

pub use clock::{Clock, SystemClock};
pub use error::PolicyError;
pub use observation::{Observation, PollResult};
pub use policy::{FinalAttempt, RetryPolicy, DEFAULT_INTERVAL, DEFAULT_TIMEOUT};
pub use poller::Poller;

#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
