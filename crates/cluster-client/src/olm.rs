//! Operator Lifecycle Manager helpers: catalog sources, subscriptions and
//! package manifests.

use crate::cluster::ClusterClient;
use crate::error::ClusterError;
use crate::matcher::Expect;
use crate::resource::ResourceQuery;
use crate::runner::CommandRunner;
use poller::Clock;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Selects the current CSV of one channel of one package from one catalog.
const CURRENT_CSV_FILTER: &str = ".items[] \
    | select(.metadata.name == $package) \
    | select(.status.catalogSource == $catalog) \
    | .status.channels[] \
    | select(.name == $channel) \
    | .currentCSV";

const OLM_API_VERSION: &str = "operators.coreos.com/v1alpha1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a, S> {
    api_version: &'a str,
    kind: &'a str,
    metadata: Metadata<'a>,
    spec: S,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    name: &'a str,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogSourceSpec<'a> {
    source_type: &'a str,
    image: &'a str,
    display_name: String,
    update_strategy: UpdateStrategy<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStrategy<'a> {
    registry_poll: RegistryPoll<'a>,
}

#[derive(Debug, Serialize)]
struct RegistryPoll<'a> {
    interval: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionSpec<'a> {
    channel: &'a str,
    install_plan_approval: &'a str,
    name: &'a str,
    source: &'a str,
    source_namespace: &'a str,
    #[serde(rename = "startingCSV", skip_serializing_if = "Option::is_none")]
    starting_csv: Option<&'a str>,
}

/// A grpc catalog source serving operator bundles from an index image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    pub name: String,
    pub image: String,
}

impl CatalogSource {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }

    pub fn manifest(&self, namespace: &str) -> Result<Value, serde_json::Error> {
        serde_json::to_value(Manifest {
            api_version: OLM_API_VERSION,
            kind: "CatalogSource",
            metadata: Metadata {
                name: &self.name,
                namespace,
            },
            spec: CatalogSourceSpec {
                source_type: "grpc",
                image: &self.image,
                display_name: format!("{} OLM registry", self.name),
                update_strategy: UpdateStrategy {
                    registry_poll: RegistryPoll { interval: "30m" },
                },
            },
        })
    }
}

/// Subscription installing an operator package with automatic approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub package: String,
    pub source: String,
    pub channel: String,
    /// Pinned starting CSV; omitted from the manifest when unknown.
    pub starting_csv: Option<String>,
}

impl Subscription {
    /// Build the manifest. Channel and CSV stay JSON strings, so a channel
    /// such as `1.0` is never read back as a number.
    pub fn manifest(
        &self,
        namespace: &str,
        source_namespace: &str,
    ) -> Result<Value, serde_json::Error> {
        serde_json::to_value(Manifest {
            api_version: OLM_API_VERSION,
            kind: "Subscription",
            metadata: Metadata {
                name: &self.package,
                namespace,
            },
            spec: SubscriptionSpec {
                channel: &self.channel,
                install_plan_approval: "Automatic",
                name: &self.package,
                source: &self.source,
                source_namespace,
                starting_csv: self.starting_csv.as_deref(),
            },
        })
    }
}

/// Query resolving a package channel's current CSV.
pub fn current_csv_query(package: &str, catalog: &str, channel: &str) -> ResourceQuery {
    ResourceQuery::list("packagemanifests")
        .jq(CURRENT_CSV_FILTER)
        .jq_arg("package", package)
        .jq_arg("catalog", catalog)
        .jq_arg("channel", channel)
}

impl<R: CommandRunner, C: Clock> ClusterClient<R, C> {
    pub fn create_catalog_source(&self, name: &str, image: &str) -> Result<String, ClusterError> {
        let source = CatalogSource::new(name, image);
        self.apply(&source.manifest(&self.config().marketplace_namespace)?)
    }

    /// Current CSV of `channel` for `package` in `catalog`, if published.
    pub fn current_csv(&self, package: &str, catalog: &str, channel: &str) -> Option<String> {
        self.observe(&current_csv_query(package, catalog, channel))
            .into_present()
    }

    /// Subscribe to `package`, pinned to its current CSV when one is known.
    pub fn create_operator_subscription(
        &self,
        package: &str,
        source: &str,
        channel: &str,
    ) -> Result<String, ClusterError> {
        let subscription = Subscription {
            package: package.to_string(),
            source: source.to_string(),
            channel: channel.to_string(),
            starting_csv: self.current_csv(package, source, channel),
        };
        info!(
            target: "cluster_client.olm",
            package,
            source,
            channel,
            starting_csv = ?subscription.starting_csv,
            "Creating operator subscription"
        );

        let config = self.config();
        let manifest =
            subscription.manifest(&config.operator_namespace, &config.marketplace_namespace)?;
        self.apply(&manifest)
    }

    /// Wait until the package manifest publishes a current CSV for `channel`.
    pub fn wait_for_package_manifest(
        &self,
        package: &str,
        source: &str,
        channel: &str,
    ) -> Result<bool, ClusterError> {
        let query = current_csv_query(package, source, channel);
        let policy = self.config().package_manifest_policy()?;

        Ok(self
            .wait_for(&query, Expect::Present, &policy)?
            .is_some())
    }
}
