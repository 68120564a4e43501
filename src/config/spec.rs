//! Bundle file types.
//!
//! This module defines the structs that map to a Distributed Application
//! Bundle (`.dab`) file. Field names follow the bundle's JSON layout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The root of a bundle file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Bundlefile {
    /// Bundle format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Services keyed by their short (unscoped) name.
    #[serde(default)]
    pub services: BTreeMap<String, BundleService>,
}

/// A single service declared in a bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BundleService {
    /// Container image reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Entrypoint override.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Arguments passed to the entrypoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment in `KEY=value` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    /// Container labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Service labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_labels: BTreeMap<String, String>,
    /// Exposed ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<BundlePort>,
    /// Working directory inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// User the container runs as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Short names of the networks the service attaches to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
}

/// A port exposed by a bundle service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BundlePort {
    /// Protocol (`tcp` or `udp`); empty means `tcp`.
    #[serde(default)]
    pub protocol: String,
    /// Container port.
    pub port: u32,
    /// Port published on the swarm, when one was assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_port: Option<u32>,
}

/// A bundle together with the stack (scope) it deploys into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// Stack name.
    pub name: String,
    /// Parsed bundle.
    pub bundle: Bundlefile,
}

fn default_version() -> String {
    String::from(BUNDLE_VERSION)
}

/// Bundle format version written on export.
pub const BUNDLE_VERSION: &str = "0.1";

impl Bundlefile {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: default_version(),
            services: BTreeMap::new(),
        }
    }

    /// Unique network short names used by any service, sorted.
    #[must_use]
    pub fn network_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .values()
            .flat_map(|s| s.networks.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for Bundlefile {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Fully-qualified names of the bundle's services in this stack.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.bundle
            .services
            .keys()
            .map(|svc| format!("{}_{svc}", self.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_bundle() {
        let json = r#"{
            "Version": "0.1",
            "Services": {
                "web": {
                    "Image": "nginx@sha256:abc",
                    "Networks": ["front", "back"],
                    "Ports": [{"Protocol": "tcp", "Port": 80}],
                    "WorkingDir": "/srv"
                },
                "db": {
                    "Image": "postgres:9.6",
                    "Env": ["POSTGRES_PASSWORD=secret"],
                    "Networks": ["back"]
                }
            }
        }"#;

        let bundle: Bundlefile = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.services.len(), 2);
        assert_eq!(bundle.services["web"].ports[0].port, 80);
        assert_eq!(bundle.services["web"].working_dir.as_deref(), Some("/srv"));
        assert_eq!(bundle.services["db"].user, None);
        assert_eq!(bundle.network_names(), ["back", "front"]);
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let mut bundle = Bundlefile::new();
        bundle.services.insert(
            String::from("web"),
            BundleService {
                image: String::from("nginx"),
                ..BundleService::default()
            },
        );

        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(json, r#"{"Version":"0.1","Services":{"web":{"Image":"nginx"}}}"#);
    }

    #[test]
    fn test_stack_service_names_are_scoped() {
        let mut bundle = Bundlefile::new();
        bundle.services.insert(String::from("web"), BundleService::default());
        bundle.services.insert(String::from("db"), BundleService::default());
        let stack = Stack {
            name: String::from("app"),
            bundle,
        };

        assert_eq!(stack.service_names(), ["app_db", "app_web"]);
    }
}
