mod types;

use std::sync::Arc;

use digsec_core::{now_nanos, ConfigError, TimeWindow, NOW};
use serde::Serialize;

pub use types::{EventBatch, EventPage, SecureEvent};

use crate::api::{
    http::HttpClient,
    types::{ApiResult, ApiSdkError},
};

pub const SECURE_EVENTS_PATH: &str = "/api/v1/secureEvents";

/// Feed filter applied by [`SecureEventsApi::get`], already url-encoded:
/// `source != "auditTrail" and severity in ("6") and not originator in
/// ("benchmarks","compliance","cloudsec")`.
pub const DEFAULT_EVENT_FILTER: &str = "filter=source%20%21%3D%20%22auditTrail%22%20and%20severity%20in%20%28%226%22%29%20and%20not%20originator%20in%20%28%22benchmarks%22%2C%22compliance%22%2C%22cloudsec%22%29";

const FILTER_CONJUNCTION: &str = "%20and%20";

/// Joins a caller filter expression onto [`DEFAULT_EVENT_FILTER`].
///
/// `filter` is an url-encoded expression without the `filter=` prefix.
pub fn compose_filter(filter: Option<&str>) -> String {
    match filter.filter(|filter| !filter.is_empty()) {
        Some(filter) => format!("{}{}{}", DEFAULT_EVENT_FILTER, FILTER_CONJUNCTION, filter),
        None => DEFAULT_EVENT_FILTER.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureEventsQuery {
    pub filter: Option<String>,
    pub limit: u32,
    /// Offset from `to`, e.g. `-1d`.
    pub from: String,
    /// `now` or an offset from the current time.
    pub to: String,
    /// Cursor of the page to fetch, forwarded as is.
    pub cursor: Option<String>,
}

impl Default for SecureEventsQuery {
    fn default() -> Self {
        Self { filter: None, limit: 100, from: "-1d".to_string(), to: NOW.to_string(), cursor: None }
    }
}

impl SecureEventsQuery {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_window(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

#[derive(Serialize)]
struct SecureEventsParams<'a> {
    limit: u32,
    from: i64,
    to: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SecureEventsApi {
    client: Arc<HttpClient>,
}

impl SecureEventsApi {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Events as shown in the feed: audit trail and posture originators are
    /// filtered out and `query.filter` narrows the result further.
    pub async fn get(&self, query: &SecureEventsQuery) -> ApiResult<EventBatch> {
        let filter = compose_filter(query.filter.as_deref());
        self.fetch(&filter, query, now_nanos()).await
    }

    /// Every event, including audit trail. `query.filter` is sent as the raw
    /// query fragment, e.g. `filter=severity%20in%20%28%220%22%29`.
    pub async fn get_all(&self, query: &SecureEventsQuery) -> ApiResult<EventBatch> {
        let filter = query.filter.as_deref().unwrap_or_default();
        self.fetch(filter, query, now_nanos()).await
    }

    async fn fetch(&self, filter: &str, query: &SecureEventsQuery, now: i64) -> ApiResult<EventBatch> {
        let window = TimeWindow::resolve(&query.from, &query.to, now).map_err(ConfigError::from)?;

        let path = if filter.is_empty() {
            SECURE_EVENTS_PATH.to_string()
        } else {
            format!("{}?{}", SECURE_EVENTS_PATH, filter)
        };
        let params = SecureEventsParams {
            limit: query.limit,
            from: window.from,
            to: window.to,
            cursor: query.cursor.as_deref(),
        };

        let response = self.client.get(&path, Some(&params)).await?;
        let (url, status) = (response.url, response.status_code);

        EventBatch::from_value(response.body).map_err(|source| ApiSdkError::MalformedResponse { url, status, source })
    }
}
