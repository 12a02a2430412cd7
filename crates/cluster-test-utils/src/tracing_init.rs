//! Test log output.

use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test harness.
///
/// Honours `RUST_LOG`, defaulting to debug for the workspace crates. Safe to
/// call from every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poller=debug,cluster_client=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
