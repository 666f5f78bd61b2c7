use std::{collections::BTreeMap, time::Duration};

use digsec_core::{ClientConfig, ConfigError};
use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Client, Request, Response,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::api::types::{ApiResponse, ApiResult, ApiSdkError, HttpErrorDetails, HttpMethod};

/// Total time allowed for one request, from connect to the last body byte.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stand-in for "no query parameters" in calls that take `Option<&Q>`.
pub const NO_PARAMS: Option<&'static ()> = None;

const REDACTED_AUTHORIZATION: &str = "Bearer ***";

/// Executes single requests against the platform.
///
/// Holds nothing mutable, so one instance can be shared between tasks.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
    auth_header: HeaderValue,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: ClientConfig, timeout: Duration) -> ApiResult<Self> {
        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", config.auth_token))
            .map_err(|_| ConfigError::InvalidAuthToken)?;
        auth_header.set_sensitive(true);

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|source| ApiSdkError::TransportFailure { url: config.url.clone(), source })?;

        Ok(Self { client, config, auth_header })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // literal concatenation, the base url is used exactly as configured
    pub(crate) fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.url, path)
    }

    /// Sends one request and classifies the outcome.
    ///
    /// * 200..=299 with a JSON (or empty) body returns an [`ApiResponse`]
    /// * any other status returns [`ApiSdkError::HttpError`]
    /// * a body that is not JSON returns [`ApiSdkError::MalformedResponse`]
    /// * connection, timeout and TLS problems return [`ApiSdkError::TransportFailure`]
    ///
    /// `body` is ignored for GET.
    pub async fn execute<Q>(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&Q>,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.build_url(path);

        let mut builder =
            self.client.request(method.into(), &url).header(AUTHORIZATION, self.auth_header.clone());
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body.filter(|_| method.allows_body()) {
            builder = builder.json(body);
        }

        let request = builder.build().map_err(|source| transport_failure(&url, source))?;
        let sent = SentRequest::capture(&request);

        debug!(%method, url = %sent.url, "sending request");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| transport_failure(&sent.url, source))?;

        classify(method, sent, response).await
    }

    pub async fn get<Q>(&self, path: &str, query: Option<&Q>) -> ApiResult<ApiResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Get, path, query, None).await
    }

    pub async fn post<Q>(
        &self,
        path: &str,
        query: Option<&Q>,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Post, path, query, body).await
    }

    pub async fn put<Q>(
        &self,
        path: &str,
        query: Option<&Q>,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Put, path, query, body).await
    }

    pub async fn delete<Q>(
        &self,
        path: &str,
        query: Option<&Q>,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Delete, path, query, body).await
    }

    pub async fn patch<Q>(
        &self,
        path: &str,
        query: Option<&Q>,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute(HttpMethod::Patch, path, query, body).await
    }
}

/// Snapshot of an outgoing request, kept for error reporting.
struct SentRequest {
    url: String,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

impl SentRequest {
    fn capture(request: &Request) -> Self {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = if *name == AUTHORIZATION {
                    REDACTED_AUTHORIZATION.to_string()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                };
                (name.as_str().to_string(), value)
            })
            .collect();

        let body = request
            .body()
            .and_then(|body| body.as_bytes())
            .and_then(|bytes| serde_json::from_slice(bytes).ok());

        Self { url: request.url().to_string(), headers, body }
    }
}

fn transport_failure(url: &str, source: reqwest::Error) -> ApiSdkError {
    error!(url, error = %source, "request failed before a response arrived");
    ApiSdkError::TransportFailure { url: url.to_string(), source }
}

/// Empty bodies and a literal `null` count as "no payload".
fn parse_body(bytes: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    match serde_json::from_slice(bytes)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

async fn classify(method: HttpMethod, sent: SentRequest, response: Response) -> ApiResult<ApiResponse> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|source| transport_failure(&sent.url, source))?;

    let payload = parse_body(&bytes).map_err(|source| {
        error!(%method, url = %sent.url, status = status.as_u16(), "response body is not valid JSON");
        ApiSdkError::MalformedResponse { url: sent.url.clone(), status: status.as_u16(), source }
    })?;

    if status.is_success() {
        debug!(%method, url = %sent.url, status = status.as_u16(), "request succeeded");
        return Ok(ApiResponse {
            status_code: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            url: sent.url,
            body: payload.unwrap_or_else(|| Value::Array(Vec::new())),
        });
    }

    error!(%method, url = %sent.url, status = status.as_u16(), "request returned an error status");
    Err(ApiSdkError::HttpError(Box::new(HttpErrorDetails {
        status: status.as_u16(),
        payload,
        request_url: sent.url,
        request_headers: sent.headers,
        request_body: sent.body,
    })))
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> HttpClient {
        HttpClient::new(ClientConfig::new(server.uri(), "test-token")).expect("http client")
    }

    #[tokio::test]
    async fn returns_success_with_parsed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/me"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 7}})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).get("/api/users/me", NO_PARAMS).await.expect("response");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.message, "OK");
        assert_eq!(response.url, format!("{}/api/users/me", server.uri()));
        assert_eq!(response.body, json!({"user": {"id": 7}}));
    }

    #[tokio::test]
    async fn every_2xx_status_is_success() {
        for code in [200u16, 201, 202, 226, 299] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(code).set_body_json(json!([code])))
                .mount(&server)
                .await;

            let response =
                client_for(&server).post("/things", NO_PARAMS, None).await.expect("response");

            assert_eq!(response.status_code, code);
            assert_eq!(response.body, json!([code]));
        }
    }

    #[tokio::test]
    async fn empty_body_defaults_to_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response =
            client_for(&server).delete("/things/1", NO_PARAMS, None).await.expect("response");

        assert_eq!(response.status_code, 204);
        assert_eq!(response.message, "No Content");
        assert_eq!(response.body, json!([]));
    }

    #[tokio::test]
    async fn non_2xx_status_is_http_error_with_request_context() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "resource not found"})),
            )
            .mount(&server)
            .await;

        let body = json!({"name": "renamed"});
        let result = client_for(&server)
            .put("/api/things/9", Some(&[("dryRun", "true")]), Some(&body))
            .await;

        match result {
            Err(ApiSdkError::HttpError(details)) => {
                assert_eq!(details.status, 404);
                assert_eq!(details.payload, Some(json!({"message": "resource not found"})));
                assert_eq!(details.request_url, format!("{}/api/things/9?dryRun=true", server.uri()));
                assert_eq!(details.request_body, Some(body));
                assert_eq!(
                    details.request_headers.get("authorization").map(String::as_str),
                    Some("Bearer ***")
                );
                assert_eq!(
                    details.request_headers.get("content-type").map(String::as_str),
                    Some("application/json")
                );
            }
            other => panic!("expected http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_outside_2xx_never_returns_response() {
        for code in [300u16, 400, 401, 404, 418, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(code).set_body_json(json!({"code": code})))
                .mount(&server)
                .await;

            let err = client_for(&server).get("/x", NO_PARAMS).await.expect_err("non 2xx must fail");

            assert_eq!(err.status(), Some(code));
            assert!(matches!(err, ApiSdkError::HttpError(_)));
        }
    }

    #[tokio::test]
    async fn malformed_json_on_success_is_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).get("/x", NO_PARAMS).await;

        assert!(matches!(result, Err(ApiSdkError::MalformedResponse { status: 200, .. })));
    }

    #[tokio::test]
    async fn malformed_json_on_error_is_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let result = client_for(&server).get("/x", NO_PARAMS).await;

        assert!(matches!(result, Err(ApiSdkError::MalformedResponse { status: 502, .. })));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpClient::new(ClientConfig::new(format!("http://{}", addr), "test-token")).unwrap();

        let result = client.get("/api/users/me", NO_PARAMS).await;

        match result {
            Err(ApiSdkError::TransportFailure { url, .. }) => {
                assert_eq!(url, format!("http://{}/api/users/me", addr));
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_response_times_out_as_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(
            ClientConfig::new(server.uri(), "test-token"),
            Duration::from_millis(100),
        )
        .unwrap();

        let result = client.get("/slow", NO_PARAMS).await;

        match result {
            Err(ApiSdkError::TransportFailure { source, .. }) => assert!(source.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_never_sends_a_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        client_for(&server)
            .execute(HttpMethod::Get, "/x", NO_PARAMS, Some(&json!({"ignored": true})))
            .await
            .expect("response");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn patch_sends_query_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/things/3"))
            .and(query_param("force", "1"))
            .and(body_json(json!({"enabled": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .patch("/api/things/3", Some(&[("force", "1")]), Some(&json!({"enabled": false})))
            .await
            .expect("response");

        assert_eq!(response.body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn empty_query_adds_no_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let params: [(&str, &str); 0] = [];
        client_for(&server).get("/x", Some(&params)).await.expect("response");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn url_is_base_plus_path_without_normalising() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client =
            HttpClient::new(ClientConfig::new(format!("{}/", server.uri()), "test-token")).unwrap();
        client.get("/api/users/me", NO_PARAMS).await.expect("response");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.path(), "//api/users/me");
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let other = client.clone();

        let (first, second) =
            tokio::join!(client.get("/a", NO_PARAMS), other.get("/b", NO_PARAMS));

        assert_eq!(first.unwrap().body, json!({"n": 1}));
        assert_eq!(second.unwrap().body, json!({"n": 1}));
    }

    #[test]
    fn token_that_is_not_a_header_value_is_config_error() {
        let result = HttpClient::new(ClientConfig::new("http://localhost", "bad\ntoken"));

        assert!(matches!(
            result,
            Err(ApiSdkError::ConfigError(ConfigError::InvalidAuthToken))
        ));
    }

    #[test]
    fn parse_body_treats_blank_and_null_as_no_payload() {
        assert_eq!(parse_body(b"").unwrap(), None);
        assert_eq!(parse_body(b"  \n").unwrap(), None);
        assert_eq!(parse_body(b"null").unwrap(), None);
        assert_eq!(parse_body(b"{}").unwrap(), Some(json!({})));
        assert!(parse_body(b"{").is_err());
    }
}
