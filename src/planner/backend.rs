//! Control-plane interface used by the executor and the reconciler.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::canonical::{Entity, EntitySet, RemoteVersion};
use crate::error::BackendError;

/// A shared network entities of a scope attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSpec {
    /// Fully-qualified network name.
    pub name: String,
    /// Network driver.
    pub driver: String,
    /// Labels, including the scope label.
    pub labels: BTreeMap<String, String>,
}

/// A network that exists on the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Network id.
    pub id: String,
    /// Network name.
    pub name: String,
}

/// Operations the reconciliation core needs from a control plane.
///
/// Every call may fail; none is retried by the caller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lists the deployed entities of a scope.
    async fn list_services(&self, scope: &str) -> Result<EntitySet, BackendError>;

    /// Creates an entity and returns its new remote id.
    async fn create_service(&self, entity: &Entity) -> Result<String, BackendError>;

    /// Replaces the spec of an existing entity.
    ///
    /// Fails with [`BackendError::ConcurrencyConflict`] if `version` is stale.
    async fn update_service(
        &self,
        remote_id: &str,
        version: &RemoteVersion,
        entity: &Entity,
    ) -> Result<(), BackendError>;

    /// Removes an entity by remote id or name.
    async fn delete_service(&self, remote_id: &str) -> Result<(), BackendError>;

    /// Lists the shared networks of a scope.
    async fn list_networks(&self, scope: &str) -> Result<Vec<NetworkInfo>, BackendError>;

    /// Creates a shared network and returns its id.
    async fn create_network(&self, network: &NetworkSpec) -> Result<String, BackendError>;
}
