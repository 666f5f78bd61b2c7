mod api;

pub use api::{
    compose_filter,
    http::{HttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, NO_PARAMS},
    ApiResponse, ApiResult, ApiSdkError, EventBatch, EventPage, HttpErrorDetails, HttpMethod,
    InventoryApi, PagingContext, SecureEvent, SecureEventsApi, SecureEventsQuery, UserApi,
    CLOUD_RESOURCE_PATH, CURRENT_USER_PATH, DEFAULT_EVENT_FILTER, GRAPH_RESOURCES_PATH,
    INVENTORY_RESOURCES_PATH, SECURE_EVENTS_PATH,
};
pub use digsec_core::{ClientConfig, ConfigError, DurationError, TimeWindow};
use std::{path::Path, sync::Arc, time::Duration};

/// Entry point: one configuration, one executor, shared by every endpoint group.
#[derive(Debug, Clone)]
pub struct Client {
    http: Arc<HttpClient>,
    pub user: UserApi,
    pub events: SecureEventsApi,
    pub inventory: InventoryApi,
}

impl Client {
    /// Create a client with the default request timeout
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: ClientConfig, timeout: Duration) -> ApiResult<Self> {
        let http = Arc::new(HttpClient::with_timeout(config, timeout)?);

        Ok(Self {
            user: UserApi::new(Arc::clone(&http)),
            events: SecureEventsApi::new(Arc::clone(&http)),
            inventory: InventoryApi::new(Arc::clone(&http)),
            http,
        })
    }

    /// Load the config file once and build a client from it
    pub fn from_config_file(path: &Path) -> ApiResult<Self> {
        Self::new(digsec_core::read(path)?)
    }

    /// The request executor, for endpoints without a typed wrapper
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn from_config_file_uses_current_environment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CURRENT_USER_PATH))
            .and(header("Authorization", "Bearer staging-secure"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 1}})))
            .expect(1)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "current-environment: staging\n\
             current-product: secure\n\
             environments:\n\
             \x20 - name: prod\n\
             \x20   url: http://127.0.0.1:1\n\
             \x20   secure: {{ token: prod-secure }}\n\
             \x20 - name: staging\n\
             \x20   url: {}\n\
             \x20   secure: {{ token: staging-secure }}\n",
            server.uri()
        )
        .unwrap();

        let client = Client::from_config_file(file.path()).unwrap();

        assert_eq!(client.config().environment, "staging");
        assert_eq!(client.user.me().await.unwrap(), json!({"user": {"id": 1}}));
    }

    #[test]
    fn from_config_file_reports_config_errors() {
        let dir = tempfile::tempdir().unwrap();

        let result = Client::from_config_file(&dir.path().join("missing.yml"));

        assert!(matches!(result, Err(ApiSdkError::ConfigError(ConfigError::CanNotFindYaml))));
    }

    #[tokio::test]
    async fn http_executor_is_shared_with_endpoint_groups() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/custom"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"created": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(ClientConfig::new(server.uri(), "token")).unwrap();
        let response = client
            .http()
            .post("/api/custom", NO_PARAMS, Some(&json!({"name": "n"})))
            .await
            .unwrap();

        assert_eq!(response.status_code, 201);
        assert_eq!(response.message, "Created");
        assert_eq!(response.body, json!({"created": true}));
    }
}
