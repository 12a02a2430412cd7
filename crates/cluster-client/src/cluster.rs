//! Cluster query client.
//!
//! [`ClusterClient`] runs structured [`ResourceQuery`]s through an injected
//! [`CommandRunner`] and waits on their results with a [`Poller`]. Transient
//! command failures become [`Observation::Failed`] inside waits, so a
//! flapping API server counts as "not yet" rather than aborting the wait.

use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::matcher::{Expect, NamePattern, StatusMatch};
use crate::resource::ResourceQuery;
use crate::runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
use poller::{Clock, Observation, PollResult, Poller, RetryPolicy, SystemClock};
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Jsonpath for a pod's lifecycle phase.
pub const POD_PHASE_PATH: &str = "{.status.phase}";

/// Jsonpath listing the status of every deployment condition.
pub const DEPLOYMENT_CONDITIONS_PATH: &str = "{.status.conditions[*].status}";

/// Client for the cluster command-line tool.
#[derive(Debug)]
pub struct ClusterClient<R, C = SystemClock> {
    runner: R,
    poller: Poller<C>,
    config: ClusterConfig,
}

impl ClusterClient<ProcessRunner> {
    /// Client spawning real processes, configured from the environment.
    pub fn from_env() -> Result<Self, ClusterError> {
        Self::from_config(ClusterConfig::from_env()?)
    }

    pub fn from_config(config: ClusterConfig) -> Result<Self, ClusterError> {
        let runner = ProcessRunner::new(config.command_timeout)?;
        Ok(Self::new(runner, config))
    }
}

impl<R: CommandRunner> ClusterClient<R> {
    pub fn new(runner: R, config: ClusterConfig) -> Self {
        Self::with_clock(runner, config, SystemClock)
    }
}

impl<R: CommandRunner, C: Clock> ClusterClient<R, C> {
    /// Client whose waits run against `clock`.
    pub fn with_clock(runner: R, config: ClusterConfig, clock: C) -> Self {
        Self {
            runner,
            poller: Poller::with_clock(clock),
            config,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn cli<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(self.config.cli.as_str()).args(args)
    }

    /// Run an invocation and require a zero exit status.
    pub(crate) fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput, ClusterError> {
        let output = self.runner.run(invocation)?;
        if !output.success() {
            return Err(ClusterError::CommandFailed {
                command: invocation.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run a query, piping through `jq` when it has a filter stage.
    ///
    /// Returns the output of the last stage that ran; a failed `get` is
    /// returned as-is without running `jq`.
    pub fn run_query(&self, query: &ResourceQuery) -> Result<CommandOutput, ClusterError> {
        let output = self.runner.run(&query.invocation(&self.config.cli))?;
        if !output.success() {
            return Ok(output);
        }

        match query.jq_invocation(&self.config.jq, &output.stdout) {
            Some(stage) => Ok(self.runner.run(&stage)?),
            None => Ok(output),
        }
    }

    /// One query attempt as an observation.
    ///
    /// Blank output is `Absent`; a non-zero exit or a runner error is
    /// `Failed`. Present values are trimmed.
    pub fn observe(&self, query: &ResourceQuery) -> Observation<String> {
        match self.run_query(query) {
            Ok(output) if output.success() => {
                let value = output.stdout.trim();
                if value.is_empty() {
                    Observation::Absent
                } else {
                    Observation::Present(value.to_string())
                }
            }
            Ok(output) => {
                debug!(
                    target: "cluster_client",
                    kind = %query.kind,
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Query failed"
                );
                Observation::Failed(failure_cause(&output))
            }
            Err(e) => {
                debug!(target: "cluster_client", kind = %query.kind, error = %e, "Query did not run");
                Observation::Failed(e.to_string())
            }
        }
    }

    /// Observe a name list and reduce it to the first name matching `pattern`.
    fn observe_match(&self, query: &ResourceQuery, pattern: &NamePattern) -> Observation<String> {
        match self.observe(query) {
            Observation::Present(list) => {
                debug!(target: "cluster_client", resources = %list, "Resource list");
                Observation::from_option(pattern.first_match(&list).map(str::to_string))
            }
            other => other,
        }
    }

    /// Wait until `query` produces an observation satisfying `expect`.
    ///
    /// Returns the satisfying value, or `None` when the policy ran out.
    /// Fails only if `expect` cannot interpret an observation.
    pub fn wait_for(
        &self,
        query: &ResourceQuery,
        expect: impl Into<Expect>,
        policy: &RetryPolicy,
    ) -> Result<Option<String>, ClusterError> {
        let expect = expect.into();
        let result = self
            .poller
            .try_poll(policy, || self.observe(query), |obs| expect.evaluate(obs))?;

        Ok(result.found().and_then(Observation::into_present))
    }

    /// Re-issue `query` until it succeeds, at most `max_attempts` times.
    ///
    /// A successful query with blank output yields `Some("")`.
    pub fn retry_until_success(
        &self,
        query: &ResourceQuery,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<Option<String>, ClusterError> {
        let policy = RetryPolicy::attempts(max_attempts, interval)?;
        let result = self
            .poller
            .poll(&policy, || self.observe(query), |obs| !obs.is_failed());

        Ok(result
            .found()
            .map(|obs| obs.into_present().unwrap_or_default()))
    }

    /// Names of all `kind` resources in `namespace`.
    pub fn resource_names(&self, kind: &str, namespace: &str) -> Result<Vec<String>, ClusterError> {
        let query = ResourceQuery::list(kind).in_namespace(namespace);
        let output = self.run_checked(&query.invocation(&self.config.cli))?;

        Ok(output.stdout.split_whitespace().map(str::to_string).collect())
    }

    pub fn pod_names(&self, namespace: &str) -> Result<Vec<String>, ClusterError> {
        self.resource_names("pods", namespace)
    }

    /// First `kind` resource in `namespace` whose name fully matches `pattern`.
    pub fn find_resource(
        &self,
        kind: &str,
        pattern: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClusterError> {
        let pattern = NamePattern::new(pattern)?;
        info!(
            target: "cluster_client",
            kind,
            pattern = pattern.as_str(),
            namespace,
            "Searching for resource"
        );

        let found = self
            .resource_names(kind, namespace)?
            .into_iter()
            .find(|name| pattern.matches(name));

        match &found {
            Some(name) => debug!(target: "cluster_client", name = %name, "Resource matched"),
            None => debug!(target: "cluster_client", kind, namespace, "No resource matched"),
        }
        Ok(found)
    }

    pub fn find_pod(&self, pattern: &str, namespace: &str) -> Result<Option<String>, ClusterError> {
        self.find_resource("pods", pattern, namespace)
    }

    /// Whether the cluster serves the `kind` resource type.
    pub fn has_resource_type(&self, kind: &str) -> bool {
        self.runner
            .run(&self.cli(["get", kind]))
            .is_ok_and(|output| output.success())
    }

    /// Wait until a `kind` resource matching `pattern` exists in `namespace`.
    pub fn wait_for_resource(
        &self,
        kind: &str,
        pattern: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClusterError> {
        let pattern = NamePattern::new(pattern)?;
        let query = ResourceQuery::list(kind).in_namespace(namespace);
        let policy = self.config.presence_policy()?;

        info!(
            target: "cluster_client",
            kind,
            pattern = pattern.as_str(),
            namespace,
            "Waiting for resource to appear"
        );

        let result = self.poller.poll(
            &policy,
            || self.observe_match(&query, &pattern),
            Observation::is_present,
        );

        Ok(result.found().and_then(Observation::into_present))
    }

    pub fn wait_for_pod(&self, pattern: &str, namespace: &str) -> Result<Option<String>, ClusterError> {
        self.wait_for_resource("pods", pattern, namespace)
    }

    /// Current phase of a pod, or `None` if it cannot be read.
    pub fn pod_status(&self, name: &str, namespace: &str) -> Option<String> {
        let query = ResourceQuery::named("pod", name)
            .in_namespace(namespace)
            .jsonpath(POD_PHASE_PATH);

        let status = self.observe(&query).into_present();
        debug!(target: "cluster_client", pod = name, status = ?status, "Pod status");
        status
    }

    /// Wait until a pod's phase satisfies `expected`.
    pub fn wait_for_pod_status(
        &self,
        name: &str,
        namespace: &str,
        expected: StatusMatch,
    ) -> Result<bool, ClusterError> {
        let query = ResourceQuery::named("pod", name)
            .in_namespace(namespace)
            .jsonpath(POD_PHASE_PATH);

        Ok(self
            .wait_for(&query, expected, &self.config.status_policy()?)?
            .is_some())
    }

    pub fn wait_for_pod_running(&self, name: &str, namespace: &str) -> Result<bool, ClusterError> {
        self.wait_for_pod_status(name, namespace, StatusMatch::exact("Running"))
    }

    /// Wait until a deployment's condition statuses satisfy `expected`.
    ///
    /// Returns the condition list that matched.
    pub fn wait_for_deployment_condition(
        &self,
        name: &str,
        namespace: &str,
        expected: StatusMatch,
    ) -> Result<Option<String>, ClusterError> {
        let query = ResourceQuery::named("deployment", name)
            .in_namespace(namespace)
            .jsonpath(DEPLOYMENT_CONDITIONS_PATH);

        self.wait_for(&query, expected, &self.config.status_policy()?)
    }

    /// Wait until every condition of a deployment is `True`.
    pub fn wait_for_deployment_ready(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClusterError> {
        self.wait_for_deployment_condition(name, namespace, StatusMatch::all_tokens("True"))
    }

    /// Read `query` once; with `wait`, retry a failed read using the
    /// configured retry policy. A read still failing is an error.
    fn extract(&self, query: &ResourceQuery, wait: bool) -> Result<String, ClusterError> {
        let mut latest = self.observe(query);

        if wait && latest.is_failed() {
            warn!(
                target: "cluster_client",
                kind = %query.kind,
                name = ?query.name,
                attempts = self.config.retry_attempts,
                "Query failed, retrying"
            );
            let policy = self.config.retry_policy()?;
            let mut last_failure = latest.clone();
            let result = self.poller.poll(
                &policy,
                || {
                    let obs = self.observe(query);
                    if obs.is_failed() {
                        last_failure = obs.clone();
                    }
                    obs
                },
                |obs| !obs.is_failed(),
            );
            latest = match result {
                PollResult::Found(obs) => obs,
                PollResult::NotFound => last_failure,
            };
        }

        match latest {
            Observation::Present(value) => Ok(value),
            Observation::Absent => Ok(String::new()),
            Observation::Failed(cause) => Err(ClusterError::QueryFailed {
                command: query.invocation(&self.config.cli).to_string(),
                cause,
            }),
        }
    }

    /// Evaluate a jsonpath template against a named resource.
    pub fn resource_jsonpath(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        template: &str,
        wait: bool,
    ) -> Result<String, ClusterError> {
        let query = ResourceQuery::named(kind, name)
            .in_namespace(namespace)
            .jsonpath(template);
        self.extract(&query, wait)
    }

    /// Evaluate a `jq` filter against a named resource's JSON.
    pub fn resource_jq(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        filter: &str,
        wait: bool,
    ) -> Result<String, ClusterError> {
        let query = ResourceQuery::named(kind, name)
            .in_namespace(namespace)
            .jq(filter);
        self.extract(&query, wait)
    }

    /// The `env` of a deployment's first container, as JSON.
    pub fn deployment_env(&self, name: &str, namespace: &str) -> Result<String, ClusterError> {
        self.resource_jsonpath(
            "deployment",
            name,
            namespace,
            "{.spec.template.spec.containers[0].env}",
            false,
        )
    }

    /// The `envFrom` of a deployment's first container, as JSON.
    pub fn deployment_env_from(&self, name: &str, namespace: &str) -> Result<String, ClusterError> {
        self.resource_jsonpath(
            "deployment",
            name,
            namespace,
            "{.spec.template.spec.containers[0].envFrom}",
            false,
        )
    }

    pub fn route_host(&self, name: &str, namespace: &str) -> Result<String, ClusterError> {
        self.resource_jsonpath("route", name, namespace, "{.status.ingress[0].host}", false)
    }

    /// Expose a service as a route of the same name.
    ///
    /// Returns whether the tool reported the service as exposed.
    pub fn expose_service(&self, name: &str, namespace: &str) -> Result<bool, ClusterError> {
        let invocation = self.cli([
            "expose".to_string(),
            format!("svc/{name}"),
            "-n".to_string(),
            namespace.to_string(),
            format!("--name={name}"),
        ]);
        let output = self.runner.run(&invocation)?;
        let exposed = Regex::new(&format!(r"{}\sexposed", regex::escape(name)))?;

        Ok(exposed.is_match(&output.stdout))
    }

    /// Apply a JSON manifest through `apply -f -`.
    pub fn apply(&self, manifest: &Value) -> Result<String, ClusterError> {
        let invocation = self
            .cli(["apply", "-f", "-"])
            .stdin(serde_json::to_string_pretty(manifest)?);
        let output = self.run_checked(&invocation)?;

        info!(target: "cluster_client", result = %output.stdout.trim(), "Applied manifest");
        Ok(output.stdout)
    }
}

fn failure_cause(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    match output.exit_code {
        Some(code) => format!("exit status {code}: {stderr}"),
        None => format!("terminated by signal: {stderr}"),
    }
}
