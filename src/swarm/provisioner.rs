//! Swarm implementation of the reconciliation backend.
//!
//! Entity specs are sent to the daemon as the JSON rendering of their
//! canonical tree, which uses the Engine API's field names.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::canonical::{Entity, EntitySet, RemoteVersion};
use crate::error::BackendError;
use crate::planner::{Backend, NetworkInfo, NetworkSpec};

use super::client::SwarmClient;
use super::observer::ServiceObserver;
use super::types::NetworkCreateRequest;

/// Backend that reconciles services on a Docker swarm.
#[derive(Debug, Clone)]
pub struct SwarmBackend {
    /// Engine API client.
    client: SwarmClient,
    /// Observer for live services.
    observer: ServiceObserver,
}

impl SwarmBackend {
    /// Creates a new swarm backend.
    #[must_use]
    pub fn new(client: SwarmClient) -> Self {
        Self {
            observer: ServiceObserver::new(client.clone()),
            client,
        }
    }

    /// The observer this backend lists services with.
    #[must_use]
    pub const fn observer(&self) -> &ServiceObserver {
        &self.observer
    }
}

#[async_trait]
impl Backend for SwarmBackend {
    async fn list_services(&self, scope: &str) -> Result<EntitySet, BackendError> {
        self.observer.observe(scope).await
    }

    async fn create_service(&self, entity: &Entity) -> Result<String, BackendError> {
        debug!("Creating service {}", entity.name);
        self.client.create_service(&entity.spec.to_json()).await
    }

    async fn update_service(
        &self,
        remote_id: &str,
        version: &RemoteVersion,
        entity: &Entity,
    ) -> Result<(), BackendError> {
        let index = version
            .as_str()
            .parse::<u64>()
            .map_err(|_| BackendError::InvalidResponse {
                message: format!("version '{version}' of {} is not an index", entity.name),
            })?;
        debug!("Updating service {} ({remote_id}) at version {index}", entity.name);
        self.client
            .update_service(remote_id, index, &entity.spec.to_json())
            .await
    }

    async fn delete_service(&self, remote_id: &str) -> Result<(), BackendError> {
        debug!("Removing service {remote_id}");
        self.client.remove_service(remote_id).await
    }

    async fn list_networks(&self, scope: &str) -> Result<Vec<NetworkInfo>, BackendError> {
        let networks = self.client.list_networks(scope).await?;
        Ok(networks
            .into_iter()
            .map(|n| NetworkInfo {
                id: n.id,
                name: n.name,
            })
            .collect())
    }

    async fn create_network(&self, network: &NetworkSpec) -> Result<String, BackendError> {
        info!("Creating network {}", network.name);
        let request = NetworkCreateRequest {
            name: network.name.clone(),
            driver: network.driver.clone(),
            check_duplicate: true,
            labels: network.labels.clone(),
        };
        self.client.create_network(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{CanonicalValue, Field};
    use crate::config::Settings;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> SwarmBackend {
        let settings = Settings::default().with_docker_host(&server.uri()).unwrap();
        SwarmBackend::new(SwarmClient::new(&settings).unwrap())
    }

    fn entity() -> Entity {
        Entity::new(
            "app_web",
            CanonicalValue::record(vec![
                Field::public("Name", CanonicalValue::text("app_web")),
                Field::public("EndpointSpec", CanonicalValue::optional(None)),
            ]),
        )
    }

    #[tokio::test]
    async fn test_create_sends_canonical_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.24/services/create"))
            .and(body_json(serde_json::json!({"Name": "app_web"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"ID": "s1"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = backend(&server).create_service(&entity()).await.unwrap();
        assert_eq!(id, "s1");
    }

    #[tokio::test]
    async fn test_update_passes_version_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.24/services/s1/update"))
            .and(query_param("version", "12"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .update_service("s1", &RemoteVersion::new("12"), &entity())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_non_numeric_version() {
        let server = MockServer::start().await;
        let err = backend(&server)
            .update_service("s1", &RemoteVersion::new("abc"), &entity())
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_create_network_labels_and_driver() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.24/networks/create"))
            .and(body_json(serde_json::json!({
                "Name": "app_back",
                "Driver": "overlay",
                "CheckDuplicate": true,
                "Labels": {"com.docker.stack.namespace": "app"}
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"Id": "n1", "Warning": ""})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let spec = NetworkSpec {
            name: String::from("app_back"),
            driver: String::from("overlay"),
            labels: BTreeMap::from([(
                String::from("com.docker.stack.namespace"),
                String::from("app"),
            )]),
        };
        let id = backend(&server).create_network(&spec).await.unwrap();
        assert_eq!(id, "n1");
    }

    #[tokio::test]
    async fn test_list_networks_maps_names_and_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.24/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"Id": "n1", "Name": "app_back", "Driver": "overlay", "Labels": null}
            ])))
            .mount(&server)
            .await;

        let networks = backend(&server).list_networks("app").await.unwrap();
        assert_eq!(
            networks,
            [NetworkInfo {
                id: String::from("n1"),
                name: String::from("app_back")
            }]
        );
    }
}
