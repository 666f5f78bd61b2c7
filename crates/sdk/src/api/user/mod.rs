use std::sync::Arc;

use serde_json::Value;

use crate::api::{
    http::{HttpClient, NO_PARAMS},
    types::ApiResult,
};

pub const CURRENT_USER_PATH: &str = "/api/users/me";

#[derive(Debug, Clone)]
pub struct UserApi {
    client: Arc<HttpClient>,
}

impl UserApi {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// The user the configured token belongs to.
    pub async fn me(&self) -> ApiResult<Value> {
        Ok(self.client.get(CURRENT_USER_PATH, NO_PARAMS).await?.body)
    }
}
