//! Error types for the poller crate.

use thiserror::Error;

/// Errors raised when a retry policy violates its invariants.
///
/// These are construction-time errors only. An ordinary timeout is never an
/// error: it is reported as [`crate::PollResult::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The interval between attempts must be strictly positive.
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    /// An attempt bound must allow at least one attempt.
    #[error("Maximum attempts must be at least 1")]
    ZeroAttempts,
}
