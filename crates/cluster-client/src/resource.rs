//! Structured resource queries.
//!
//! A [`ResourceQuery`] describes what to read (kind, name, namespace) and how
//! to extract it (names list, jsonpath, raw JSON, or a `jq` filter). It is
//! turned into argument vectors here, so no caller ever formats a command
//! string.

use crate::runner::Invocation;

/// How the query output is extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Space-separated `metadata.name` of every listed item.
    Names,
    /// A jsonpath template, e.g. `{.status.phase}`.
    JsonPath(String),
    /// The raw JSON document.
    Json,
    /// The JSON document piped through `jq -rc <filter>`.
    ///
    /// `args` become `--arg name value` bindings, referenced in the filter as
    /// `$name`, so values never need quoting inside the filter.
    Jq {
        filter: String,
        args: Vec<(String, String)>,
    },
}

/// Descriptor for a single `get` against the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub kind: String,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub output: Output,
}

impl ResourceQuery {
    /// Query listing the names of every `kind` resource.
    pub fn list(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            namespace: None,
            output: Output::Names,
        }
    }

    /// Query a single named resource, returning its JSON by default.
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: Some(name.into()),
            namespace: None,
            output: Output::Json,
        }
    }

    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn jsonpath(mut self, template: impl Into<String>) -> Self {
        self.output = Output::JsonPath(template.into());
        self
    }

    #[must_use]
    pub fn json(mut self) -> Self {
        self.output = Output::Json;
        self
    }

    #[must_use]
    pub fn jq(mut self, filter: impl Into<String>) -> Self {
        self.output = Output::Jq {
            filter: filter.into(),
            args: Vec::new(),
        };
        self
    }

    /// Bind a `jq` variable. Has no effect unless the output is [`Output::Jq`].
    #[must_use]
    pub fn jq_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Output::Jq { args, .. } = &mut self.output {
            args.push((name.into(), value.into()));
        }
        self
    }

    /// Arguments for the cluster CLI's `get` subcommand.
    pub fn get_args(&self) -> Vec<String> {
        let mut args = vec!["get".to_string(), self.kind.clone()];

        if let Some(name) = &self.name {
            args.push(name.clone());
        }
        if let Some(namespace) = &self.namespace {
            args.push("-n".to_string());
            args.push(namespace.clone());
        }

        args.push("-o".to_string());
        args.push(match &self.output {
            Output::Names => "jsonpath={.items[*].metadata.name}".to_string(),
            Output::JsonPath(template) => format!("jsonpath={template}"),
            Output::Json | Output::Jq { .. } => "json".to_string(),
        });

        args
    }

    /// The `get` invocation for `cli`.
    pub fn invocation(&self, cli: &str) -> Invocation {
        Invocation::new(cli).args(self.get_args())
    }

    /// The `jq` stage fed with `document`, if this query has one.
    pub fn jq_invocation(&self, jq: &str, document: &str) -> Option<Invocation> {
        let Output::Jq { filter, args } = &self.output else {
            return None;
        };

        let mut invocation = Invocation::new(jq).arg("-rc");
        for (name, value) in args {
            invocation = invocation.args(["--arg", name.as_str(), value.as_str()]);
        }
        Some(invocation.arg(filter.as_str()).stdin(document))
    }
}
