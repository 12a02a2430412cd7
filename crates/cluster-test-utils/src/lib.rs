//! # Cluster Test Utilities
//!
//! Shared test utilities for the poller and cluster client.
//!
//! This crate provides:
//! - A scripted command runner (`ScriptedRunner`) replacing `oc`/`jq`
//! - Canned cluster output (pod lists, package manifests)
//! - Virtual time (`ManualClock`, re-exported from `poller`)
//! - `tracing` initialisation for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cluster_test_utils::*;
//!
//! #[test]
//! fn test_example() {
//!     let runner = ScriptedRunner::new()
//!         .on("get pods", [ok(pod_list_without_app()), ok(pod_list_with_app())]);
//!     let clock = ManualClock::new();
//!     let client = scripted_client(&runner, &clock);
//!
//!     let pod = client.wait_for_pod(TEST_APP_POD_PATTERN, TEST_NAMESPACE).unwrap();
//!     assert_eq!(pod.as_deref(), Some(TEST_APP_POD));
//! }
//! ```

pub mod fixtures;
pub mod scripted_runner;
pub mod tracing_init;

pub use fixtures::*;
pub use poller::ManualClock;
pub use scripted_runner::*;
pub use tracing_init::init_tracing;

use cluster_client::ClusterClient;

/// Client over a scripted runner and a virtual clock, with default config.
pub fn scripted_client<'a>(
    runner: &'a ScriptedRunner,
    clock: &'a ManualClock,
) -> ClusterClient<&'a ScriptedRunner, &'a ManualClock> {
    ClusterClient::with_clock(runner, test_config(), clock)
}
