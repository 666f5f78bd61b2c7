use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Pagination block returned with every events page. Cursors are opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next: Option<String>,
}

/// One entry of the secure events feed.
///
/// Known fields are filled only when the value has the expected type; a
/// missing or differently shaped value stays in `extra` under its original
/// key. Any JSON object therefore reads as an event and serializes back to
/// the object it was read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct SecureEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for SecureEvent {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_field(&mut fields, "id"),
            cursor: take_field(&mut fields, "cursor"),
            timestamp: take_field(&mut fields, "timestamp"),
            customer_id: take_field(&mut fields, "customerId"),
            originator: take_field(&mut fields, "originator"),
            category: take_field(&mut fields, "category"),
            source: take_field(&mut fields, "source"),
            name: take_field(&mut fields, "name"),
            description: take_field(&mut fields, "description"),
            severity: take_field(&mut fields, "severity"),
            content: take_field(&mut fields, "content"),
            labels: take_field(&mut fields, "labels"),
            actions: take_field(&mut fields, "actions"),
            agent_id: take_field(&mut fields, "agentId"),
            machine_id: take_field(&mut fields, "machineId"),
            container_id: take_field(&mut fields, "containerId"),
            extra: fields,
        }
    }
}

/// Moves `key` out of `fields` if it converts to `T`, otherwise leaves it.
fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key).filter(|value| !value.is_null())?;
    let typed = T::deserialize(value).ok()?;
    fields.remove(key);
    Some(typed)
}

/// A page of secure events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(rename = "data", default, deserialize_with = "null_as_default")]
    pub items: Vec<SecureEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: EventPage,
}

impl EventBatch {
    /// Builds a batch from the raw `{"data": [...], "page": {...}}` body.
    ///
    /// A response without payload (empty array) is an empty batch.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(items) if items.is_empty() => Ok(Self::default()),
            value => serde_json::from_value(value),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
