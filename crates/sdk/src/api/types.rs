use std::{collections::BTreeMap, fmt};

use digsec_core::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Successful response: status in 200..=299 and a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status_code: u16,
    /// Canonical reason phrase for `status_code`, empty if the code has none.
    pub message: String,
    /// URL the request was sent to, query string included.
    #[serde(default)]
    pub url: String,
    /// Parsed body; an empty array when the server sent no payload.
    pub body: Value,
}

/// What was sent alongside a response outside the 2xx range.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpErrorDetails {
    pub status: u16,
    pub payload: Option<Value>,
    pub request_url: String,
    /// Header names are lower case; the authorization value is redacted.
    pub request_headers: BTreeMap<String, String>,
    pub request_body: Option<Value>,
}

#[derive(Error, Debug)]
pub enum ApiSdkError {
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Request to {url} failed: {source}")]
    TransportFailure { url: String, source: reqwest::Error },

    #[error("Response from {url} (status {status}) is not valid JSON: {source}")]
    MalformedResponse { url: String, status: u16, source: serde_json::Error },

    #[error("HTTP error {} from {}", .0.status, .0.request_url)]
    HttpError(Box<HttpErrorDetails>),
}

impl ApiSdkError {
    /// Status code of the response that caused the error, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiSdkError::MalformedResponse { status, .. } => Some(*status),
            ApiSdkError::HttpError(details) => Some(details.status),
            ApiSdkError::ConfigError(_) | ApiSdkError::TransportFailure { .. } => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiSdkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// GET requests never carry a body.
    pub fn allows_body(self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingContext {
    pub page_number: u32,
    pub page_size: u32,
}

impl PagingContext {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self { page_number, page_size }
    }
}

impl Default for PagingContext {
    fn default() -> Self {
        Self { page_number: 1, page_size: 100 }
    }
}
