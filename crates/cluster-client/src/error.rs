//! Cluster client errors.

use crate::config::ConfigError;
use crate::runner::RunnerError;
use poller::PolicyError;
use thiserror::Error;

/// Hard failures surfaced to the caller.
///
/// Timing out while waiting is not among them: waits return `None`/`false`
/// and the caller decides whether that fails the test.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Command failed to run: {0}")]
    Runner(#[from] RunnerError),

    #[error("`{command}` exited with status {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A query still failing after its retries.
    #[error("Query `{command}` failed: {cause}")]
    QueryFailed { command: String, cause: String },

    /// Output the status matcher cannot interpret. Not retried.
    #[error("Malformed observation: {0}")]
    MalformedObservation(String),

    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid retry policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
