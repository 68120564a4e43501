//! Docker Engine swarm API types.
//!
//! This module defines the subset of the Engine API's service and network
//! objects whaleprint reads and writes. Field names follow the API's JSON.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Label that ties services and networks to a stack.
pub const NAMESPACE_LABEL: &str = "com.docker.stack.namespace";

/// A swarm service as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    /// Service id.
    #[serde(rename = "ID")]
    pub id: String,
    /// Object version, sent back with updates.
    #[serde(default)]
    pub version: Version,
    /// Service specification.
    #[serde(default)]
    pub spec: ServiceSpec,
    /// Runtime endpoint, including published ports.
    #[serde(default)]
    pub endpoint: Endpoint,
}

/// Object version.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Version {
    /// Monotonic index.
    #[serde(default)]
    pub index: u64,
}

/// The user-controlled part of a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    /// Fully-qualified service name.
    #[serde(default)]
    pub name: String,
    /// Service labels.
    #[serde(default, deserialize_with = "nullable")]
    pub labels: BTreeMap<String, String>,
    /// Task template.
    #[serde(default)]
    pub task_template: TaskSpec,
    /// Scheduling mode.
    #[serde(default)]
    pub mode: ServiceMode,
    /// Rolling update policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_config: Option<UpdateConfig>,
    /// Network attachments.
    #[serde(default, deserialize_with = "nullable")]
    pub networks: Vec<NetworkAttachmentConfig>,
    /// Endpoint configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_spec: Option<EndpointSpec>,
}

/// Task template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSpec {
    /// Container specification.
    #[serde(default)]
    pub container_spec: ContainerSpec,
    /// Counter bumped to force a redeploy; maintained by the control plane.
    #[serde(default)]
    pub force_update: u64,
}

/// Container specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSpec {
    /// Image reference.
    #[serde(default)]
    pub image: String,
    /// Container labels.
    #[serde(default, deserialize_with = "nullable")]
    pub labels: BTreeMap<String, String>,
    /// Entrypoint override.
    #[serde(default, deserialize_with = "nullable")]
    pub command: Vec<String>,
    /// Entrypoint arguments.
    #[serde(default, deserialize_with = "nullable")]
    pub args: Vec<String>,
    /// Environment in `KEY=value` form.
    #[serde(default, deserialize_with = "nullable")]
    pub env: Vec<String>,
    /// Working directory.
    #[serde(default)]
    pub dir: String,
    /// User.
    #[serde(default)]
    pub user: String,
}

/// Scheduling mode; exactly one side is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceMode {
    /// Replicated mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicated: Option<ReplicatedService>,
    /// Global mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalService>,
}

/// Replicated mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicatedService {
    /// Desired replica count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u64>,
}

/// Global mode marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalService {}

/// Rolling update policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateConfig {
    /// Tasks updated at once.
    #[serde(default)]
    pub parallelism: u64,
    /// Delay between batches, in nanoseconds.
    #[serde(default)]
    pub delay: u64,
    /// What to do when an update fails.
    #[serde(default)]
    pub failure_action: String,
}

/// A network attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAttachmentConfig {
    /// Network name or id.
    pub target: String,
    /// Aliases on that network.
    #[serde(default, deserialize_with = "nullable")]
    pub aliases: Vec<String>,
}

/// Endpoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSpec {
    /// Resolution mode (`vip` or `dnsrr`).
    #[serde(default)]
    pub mode: String,
    /// Exposed ports.
    #[serde(default, deserialize_with = "nullable")]
    pub ports: Vec<PortConfig>,
}

/// A port mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PortConfig {
    /// Optional port name.
    #[serde(default)]
    pub name: String,
    /// `tcp` or `udp`.
    #[serde(default)]
    pub protocol: String,
    /// Port inside the container.
    #[serde(default)]
    pub target_port: u32,
    /// Port published on the swarm (0 lets the swarm choose).
    #[serde(default)]
    pub published_port: u32,
}

/// Runtime endpoint state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    /// Ports as actually published.
    #[serde(default, deserialize_with = "nullable")]
    pub ports: Vec<PortConfig>,
}

/// A network as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Network {
    /// Network id.
    #[serde(rename = "Id")]
    pub id: String,
    /// Network name.
    pub name: String,
    /// Driver.
    #[serde(default)]
    pub driver: String,
    /// Labels.
    #[serde(default, deserialize_with = "nullable")]
    pub labels: BTreeMap<String, String>,
}

/// Request body for creating a network.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkCreateRequest {
    /// Network name.
    pub name: String,
    /// Driver.
    pub driver: String,
    /// Fail instead of returning an existing network of the same name.
    pub check_duplicate: bool,
    /// Labels.
    pub labels: BTreeMap<String, String>,
}

/// Response of a create call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResponse {
    /// Id of the new object.
    #[serde(alias = "ID", alias = "Id")]
    pub id: String,
}

/// Error body returned by the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// Deserializes `null` as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Service {
    /// Stack the service belongs to, if it carries the namespace label.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.spec.labels.get(NAMESPACE_LABEL).map(String::as_str)
    }
}
