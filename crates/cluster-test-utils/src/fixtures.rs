//! Canned cluster output for deterministic tests.
//!
//! Names and documents mirror what `oc get` prints for a small demo
//! namespace, so scripted tests read like the real thing.

use cluster_client::ClusterConfig;
use serde_json::{json, Value};

pub const TEST_NAMESPACE: &str = "demo";

// Pods
pub const TEST_APP_POD: &str = "nodejs-app-6d8c4b7f9-x2kq7";
pub const TEST_BUILD_POD: &str = "nodejs-app-1-build";
pub const TEST_DB_POD: &str = "postgres-0";
pub const TEST_APP_POD_PATTERN: &str = "nodejs-app-[a-z0-9]+-[a-z0-9]+";

// Operator lifecycle
pub const TEST_PACKAGE: &str = "service-binding-operator";
pub const TEST_CATALOG: &str = "sbo-catalog";
pub const TEST_CHANNEL: &str = "beta";
pub const TEST_CSV: &str = "service-binding-operator.v0.1.1-352";

/// `jsonpath={.items[*].metadata.name}` output before the app pod starts.
pub fn pod_list_without_app() -> String {
    format!("{TEST_BUILD_POD} {TEST_DB_POD}")
}

/// `jsonpath={.items[*].metadata.name}` output once the app pod exists.
pub fn pod_list_with_app() -> String {
    format!("{TEST_BUILD_POD} {TEST_APP_POD} {TEST_DB_POD}")
}

/// Package manifest list publishing [`TEST_CSV`] on [`TEST_CHANNEL`].
pub fn package_manifests() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [{
            "metadata": { "name": TEST_PACKAGE },
            "status": {
                "catalogSource": TEST_CATALOG,
                "channels": [
                    { "name": "alpha", "currentCSV": "service-binding-operator.v0.0.23" },
                    { "name": TEST_CHANNEL, "currentCSV": TEST_CSV }
                ]
            }
        }]
    })
}

/// Default configuration with the stock tool names.
pub fn test_config() -> ClusterConfig {
    ClusterConfig::default()
}
