//! Service observer for reading the live state of a stack.
//!
//! The daemon is asked for a stack's services by label; the result is
//! filtered again client-side, since older daemons ignore unknown filters.

use tracing::{debug, info};

use crate::canonical::{Entity, EntitySet, RemoteVersion, ToCanonical};

use super::client::{ApiResult, SwarmClient};
use super::types::Service;

/// Observer for stack services.
#[derive(Debug, Clone)]
pub struct ServiceObserver {
    /// Engine API client.
    client: SwarmClient,
}

impl ServiceObserver {
    /// Creates a new service observer.
    #[must_use]
    pub const fn new(client: SwarmClient) -> Self {
        Self { client }
    }

    /// Lists the live services of a stack, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn stack_services(&self, scope: &str) -> ApiResult<Vec<Service>> {
        info!("Listing services for stack: {scope}");

        let mut services: Vec<Service> = self
            .client
            .list_services(scope)
            .await?
            .into_iter()
            .filter(|s| s.stack() == Some(scope))
            .collect();
        services.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));

        debug!("Found {} services in stack {scope}", services.len());
        Ok(services)
    }

    /// Lists every service in the swarm.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn all_services(&self) -> ApiResult<Vec<Service>> {
        info!("Listing all services");
        self.client.list_all_services().await
    }

    /// Observes a stack as canonical entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn observe(&self, scope: &str) -> ApiResult<EntitySet> {
        let services = self.stack_services(scope).await?;
        Ok(services.iter().map(observed_entity).collect())
    }
}

/// Converts a live service into an observed entity.
#[must_use]
pub fn observed_entity(service: &Service) -> Entity {
    Entity::observed(
        service.spec.name.clone(),
        service.spec.to_canonical(),
        service.id.clone(),
        RemoteVersion::new(service.version.index.to_string()),
    )
}
