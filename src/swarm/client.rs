//! Docker Engine API client implementation.
//!
//! This module provides the HTTP client for the swarm service and network
//! endpoints. Reads are retried on transport failures; writes never are.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::Settings;
use crate::error::BackendError;

use super::types::{
    CreateResponse, ErrorResponse, NAMESPACE_LABEL, Network, NetworkCreateRequest, Service,
};

/// Maximum number of attempts for idempotent reads.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 500;

/// Result type for API calls.
pub type ApiResult<T> = std::result::Result<T, BackendError>;

/// Docker Engine API client.
#[derive(Debug, Clone)]
pub struct SwarmClient {
    /// HTTP client.
    client: Client,
    /// Versioned API root, e.g. `http://127.0.0.1:2375/v1.24`.
    api_root: String,
}

impl SwarmClient {
    /// Creates a new client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: &Settings) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| BackendError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_root: format!("{}/v{}", settings.base_url, settings.api_version),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.api_root))
    }

    /// Sends a GET request, retrying transport failures.
    async fn get<T: DeserializeOwned>(&self, path: &str, filters: Option<&str>) -> ApiResult<T> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES} for GET {path}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            let mut request = self.request(Method::GET, path);
            if let Some(filters) = filters {
                request = request.query(&[("filters", filters)]);
            }

            match Self::send(request, path).await {
                Ok(response) => return Self::json(response).await,
                Err(e @ BackendError::NetworkError { .. }) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| BackendError::network("Max retries exceeded")))
    }

    /// Sends a request once and maps non-2xx statuses to errors.
    ///
    /// `subject` names the object the request concerns, for error messages.
    async fn send(request: RequestBuilder, subject: &str) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        trace!("{subject}: HTTP {status}");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        Err(classify(status, subject, message))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response.json().await.map_err(|e| BackendError::InvalidResponse {
            message: format!("Failed to parse response: {e}"),
        })
    }

    /// Lists the services of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list_services(&self, scope: &str) -> ApiResult<Vec<Service>> {
        self.get("/services", Some(&namespace_filter(scope))).await
    }

    /// Lists every service in the swarm.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list_all_services(&self) -> ApiResult<Vec<Service>> {
        self.get("/services", None).await
    }

    /// Creates a service from a JSON spec and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be created.
    pub async fn create_service(&self, spec: &serde_json::Value) -> ApiResult<String> {
        let name = spec.get("Name").and_then(|n| n.as_str()).unwrap_or("service");
        let request = self.request(Method::POST, "/services/create").json(spec);
        let response = Self::send(request, name).await?;
        let created: CreateResponse = Self::json(response).await?;
        Ok(created.id)
    }

    /// Replaces a service's spec.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ConcurrencyConflict`] if `version` is stale.
    pub async fn update_service(
        &self,
        id: &str,
        version: u64,
        spec: &serde_json::Value,
    ) -> ApiResult<()> {
        let request = self
            .request(Method::POST, &format!("/services/{id}/update"))
            .query(&[("version", version)])
            .json(spec);
        Self::send(request, id).await?;
        Ok(())
    }

    /// Removes a service by id or name.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be removed.
    pub async fn remove_service(&self, id: &str) -> ApiResult<()> {
        let request = self.request(Method::DELETE, &format!("/services/{id}"));
        Self::send(request, id).await?;
        Ok(())
    }

    /// Lists the networks of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list_networks(&self, scope: &str) -> ApiResult<Vec<Network>> {
        self.get("/networks", Some(&namespace_filter(scope))).await
    }

    /// Creates a network and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be created.
    pub async fn create_network(&self, request: &NetworkCreateRequest) -> ApiResult<String> {
        let http = self.request(Method::POST, "/networks/create").json(request);
        let response = Self::send(http, &request.name).await?;
        let created: CreateResponse = Self::json(response).await?;
        Ok(created.id)
    }
}

/// Label filter selecting one stack's objects.
fn namespace_filter(scope: &str) -> String {
    serde_json::json!({ "label": [format!("{NAMESPACE_LABEL}={scope}")] }).to_string()
}

/// Maps a failed response onto the error taxonomy.
fn classify(status: StatusCode, subject: &str, message: String) -> BackendError {
    if status == StatusCode::CONFLICT || message.contains("update out of sequence") {
        return BackendError::ConcurrencyConflict {
            id: subject.to_string(),
            message,
        };
    }
    if status == StatusCode::NOT_FOUND {
        return BackendError::NotFound {
            id: subject.to_string(),
        };
    }
    BackendError::api_error(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> SwarmClient {
        let settings = Settings::default().with_docker_host(&server.uri()).unwrap();
        SwarmClient::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_list_services_sends_namespace_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.24/services"))
            .and(query_param(
                "filters",
                r#"{"label":["com.docker.stack.namespace=app"]}"#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"ID": "s1", "Version": {"Index": 4}, "Spec": {"Name": "app_web"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let services = client(&server).await.list_services("app").await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].spec.name, "app_web");
        assert_eq!(services[0].version.index, 4);
    }

    #[tokio::test]
    async fn test_create_service_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.24/services/create"))
            .and(body_partial_json(serde_json::json!({"Name": "app_web"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"ID": "new-id"})),
            )
            .mount(&server)
            .await;

        let id = client(&server)
            .await
            .create_service(&serde_json::json!({"Name": "app_web"}))
            .await
            .unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn test_stale_update_is_a_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.24/services/s1/update"))
            .and(query_param("version", "3"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "rpc error: code = 2 desc = update out of sequence"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .update_service("s1", 3, &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::ConcurrencyConflict { ref id, .. } if id == "s1"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_service_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1.24/services/app_gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "service app_gone not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.remove_service("app_gone").await.unwrap_err();
        assert_eq!(
            err,
            BackendError::NotFound {
                id: String::from("app_gone")
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.24/networks/create"))
            .respond_with(ResponseTemplate::new(500).set_body_string("pool overlaps"))
            .mount(&server)
            .await;

        let request = NetworkCreateRequest {
            name: String::from("app_back"),
            driver: String::from("overlay"),
            check_duplicate: true,
            labels: std::collections::BTreeMap::new(),
        };
        let err = client(&server).await.create_network(&request).await.unwrap_err();

        assert_eq!(err, BackendError::api_error(500, "pool overlaps"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.24/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).await.list_networks("app").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify(StatusCode::CONFLICT, "x", String::new()),
            BackendError::ConcurrencyConflict { .. }
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "x", String::from("bad")),
            BackendError::ApiRequestFailed { status: 400, .. }
        ));
    }
}
