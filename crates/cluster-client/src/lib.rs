//! Cluster Query Client
//!
//! Helpers for acceptance tests that drive a cluster through its command-line
//! tool (`oc` or `kubectl`) and `jq`, and wait for resources to converge:
//! a pod appearing, a pod reaching `Running`, deployment conditions turning
//! `True`, an operator package publishing its current CSV.
//!
//! Queries are structured [`ResourceQuery`] descriptors run through an
//! injected [`CommandRunner`]; waits use the [`poller`] crate. A wait that
//! runs out of time returns `None`/`false`; deciding whether that fails the
//! test is up to the caller.
//!
//! # Usage
//!
//! ```no_run
//! use cluster_client::{ClusterClient, ResourceQuery, StatusMatch};
//! use poller::RetryPolicy;
//! use std::time::Duration;
//!
//! let client = ClusterClient::from_env()?;
//!
//! let pod = client
//!     .wait_for_pod("nodejs-app-.*", "demo")?
//!     .expect("application pod should appear");
//! assert!(client.wait_for_pod_running(&pod, "demo")?);
//!
//! let query = ResourceQuery::named("deployment", "nodejs-app")
//!     .in_namespace("demo")
//!     .jsonpath("{.status.readyReplicas}");
//! let policy = RetryPolicy::timed(Duration::from_secs(5), Duration::from_secs(120))?;
//! client.wait_for(&query, StatusMatch::exact("1"), &policy)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Live-cluster tests
//!
//! ```bash
//! # Unit and scripted tests only
//! cargo test -p cluster-client
//!
//! # Against the current kube context
//! CLUSTER_CLI=kubectl cargo test -p cluster-client --features cluster
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod matcher;
pub mod olm;
pub mod resource;
pub mod runner;

pub use cluster::ClusterClient;
pub use config::{ClusterConfig, ConfigError};
pub use error::ClusterError;
pub use matcher::{Expect, NamePattern, StatusMatch};
pub use olm::{CatalogSource, Subscription};
pub use resource::{Output, ResourceQuery};
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner, RunnerError};
