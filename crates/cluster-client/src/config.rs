//! Client configuration loaded from environment variables.

use poller::{PolicyError, RetryPolicy, DEFAULT_INTERVAL, DEFAULT_TIMEOUT};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Cluster command-line tool (`oc` or `kubectl`).
    pub cli: String,
    /// JSON query tool.
    pub jq: String,
    /// Deadline for a single command invocation.
    pub command_timeout: Duration,
    /// Spacing between poll attempts.
    pub poll_interval: Duration,
    /// Budget for a resource/pod to appear.
    pub pod_timeout: Duration,
    /// Budget for a pod phase or deployment condition to be reached.
    pub status_timeout: Duration,
    /// Budget for a package manifest to publish a current CSV.
    pub package_manifest_timeout: Duration,
    /// Attempts made by retry-on-error queries.
    pub retry_attempts: u32,
    pub retry_interval: Duration,
    pub operator_namespace: String,
    pub marketplace_namespace: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid retry policy: {0}")]
    Policy(#[from] PolicyError),
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cli: "oc".to_string(),
            jq: "jq".to_string(),
            command_timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_INTERVAL,
            pod_timeout: DEFAULT_TIMEOUT,
            status_timeout: Duration::from_secs(300),
            package_manifest_timeout: Duration::from_secs(120),
            retry_attempts: 5,
            retry_interval: Duration::from_secs(5),
            operator_namespace: "openshift-operators".to_string(),
            marketplace_namespace: "openshift-marketplace".to_string(),
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            cli: vars.get("CLUSTER_CLI").cloned().unwrap_or(defaults.cli),
            jq: vars.get("JQ_BIN").cloned().unwrap_or(defaults.jq),
            command_timeout: secs_var(vars, "CLUSTER_COMMAND_TIMEOUT_SECS")?
                .unwrap_or(defaults.command_timeout),
            poll_interval: secs_var(vars, "POLL_INTERVAL_SECS")?.unwrap_or(defaults.poll_interval),
            pod_timeout: secs_var(vars, "POD_WAIT_TIMEOUT_SECS")?.unwrap_or(defaults.pod_timeout),
            status_timeout: secs_var(vars, "STATUS_WAIT_TIMEOUT_SECS")?
                .unwrap_or(defaults.status_timeout),
            package_manifest_timeout: secs_var(vars, "PACKAGE_MANIFEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.package_manifest_timeout),
            retry_attempts: parse_var::<u32>(vars, "RETRY_ATTEMPTS")?
                .unwrap_or(defaults.retry_attempts),
            retry_interval: secs_var(vars, "RETRY_INTERVAL_SECS")?
                .unwrap_or(defaults.retry_interval),
            operator_namespace: vars
                .get("OPERATOR_NAMESPACE")
                .cloned()
                .unwrap_or(defaults.operator_namespace),
            marketplace_namespace: vars
                .get("MARKETPLACE_NAMESPACE")
                .cloned()
                .unwrap_or(defaults.marketplace_namespace),
        };

        if config.command_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "CLUSTER_COMMAND_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        // Intervals and attempt counts the poller would refuse.
        config.presence_policy()?;
        config.retry_policy()?;

        Ok(config)
    }

    /// Policy for waiting until a resource appears.
    pub fn presence_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::timed(self.poll_interval, self.pod_timeout)
    }

    /// Policy for waiting until a resource reports a status.
    pub fn status_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::timed(self.poll_interval, self.status_timeout)
    }

    pub fn package_manifest_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::timed(self.poll_interval, self.package_manifest_timeout)
    }

    /// Attempt-bounded policy for re-issuing failed queries.
    pub fn retry_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::attempts(self.retry_attempts, self.retry_interval)
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    vars.get(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn secs_var(vars: &HashMap<String, String>, name: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_var::<u64>(vars, name)?.map(Duration::from_secs))
}
