use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::api::{
    http::{HttpClient, NO_PARAMS},
    types::{ApiResult, PagingContext},
};

pub const INVENTORY_RESOURCES_PATH: &str = "/api/cspm/v1/inventory/resources";
pub const CLOUD_RESOURCE_PATH: &str = "/api/cspm/v1/cloud/resource";
pub const GRAPH_RESOURCES_PATH: &str = "/api/cspm/v1/inventory/graph-resources";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldsParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct InventoryApi {
    client: Arc<HttpClient>,
}

impl InventoryApi {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Inventory resources matching `filter`; an empty filter matches everything.
    pub async fn list(&self, filter: &str, paging: &PagingContext) -> ApiResult<Value> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ListParams<'a> {
            filter: &'a str,
            #[serde(flatten)]
            paging: &'a PagingContext,
        }

        let params = ListParams { filter, paging };
        Ok(self.client.get(INVENTORY_RESOURCES_PATH, Some(&params)).await?.body)
    }

    pub async fn get_resource(&self, id: &str, fields: Option<&str>) -> ApiResult<Value> {
        let endpoint = format!("{}/{}", INVENTORY_RESOURCES_PATH, id);
        Ok(self.client.get(&endpoint, Some(&FieldsParams { fields })).await?.body)
    }

    pub async fn cloud_resource(&self, resource_hash: &str, fields: Option<&str>) -> ApiResult<Value> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CloudResourceParams<'a> {
            resource_hash: &'a str,
            #[serde(flatten)]
            fields: FieldsParams<'a>,
        }

        let params = CloudResourceParams { resource_hash, fields: FieldsParams { fields } };
        Ok(self.client.get(CLOUD_RESOURCE_PATH, Some(&params)).await?.body)
    }

    /// Resources from the graph inventory.
    pub async fn graph_resources(
        &self,
        filter: Option<&str>,
        fields: Option<&str>,
        paging: &PagingContext,
    ) -> ApiResult<Value> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GraphResourcesParams<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<&'a str>,
            #[serde(flatten)]
            fields: FieldsParams<'a>,
            #[serde(flatten)]
            paging: &'a PagingContext,
        }

        let params = GraphResourcesParams {
            filter: filter.filter(|filter| !filter.is_empty()),
            fields: FieldsParams { fields },
            paging,
        };
        Ok(self.client.get(GRAPH_RESOURCES_PATH, Some(&params)).await?.body)
    }

    /// A single graph resource, e.g. kind `aws_ec2_instance`.
    pub async fn graph_resource(
        &self,
        resource_hash: &str,
        resource_kind: &str,
        fields: Option<&str>,
    ) -> ApiResult<Value> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GraphResourceParams<'a> {
            resource_hash: &'a str,
            resource_kind: &'a str,
            #[serde(flatten)]
            fields: FieldsParams<'a>,
        }

        let params =
            GraphResourceParams { resource_hash, resource_kind, fields: FieldsParams { fields } };
        Ok(self.client.get(GRAPH_RESOURCES_PATH, Some(&params)).await?.body)
    }

    /// GET on a caller-built path, query string included, e.g.
    /// `/api/cspm/v1/kube/resource?resourceHash=...&resourceKind=Job`.
    pub async fn raw(&self, endpoint: &str) -> ApiResult<Value> {
        Ok(self.client.get(endpoint, NO_PARAMS).await?.body)
    }
}
