mod events;
pub mod http;
mod inventory;
mod types;
mod user;

pub use events::{
    compose_filter, EventBatch, EventPage, SecureEvent, SecureEventsApi, SecureEventsQuery,
    DEFAULT_EVENT_FILTER, SECURE_EVENTS_PATH,
};
pub use inventory::{
    InventoryApi, CLOUD_RESOURCE_PATH, GRAPH_RESOURCES_PATH, INVENTORY_RESOURCES_PATH,
};
pub use types::{ApiResponse, ApiResult, ApiSdkError, HttpErrorDetails, HttpMethod, PagingContext};
pub use user::{UserApi, CURRENT_USER_PATH};
