//! Reshaping of upstream Guacamole payloads into the frontend's JSON.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::errors::FetchError;

static HOSTNAME_ATTRIBUTE: &str = "guacd-hostname";
static HOSTNAME_MISSING: &str = "N/A";

/// `{"alice": {...}, "bob": {...}}` -> `{"users": ["alice", "bob"]}`
pub fn users_payload(upstream: Value) -> Result<Value, FetchError> {
    let users: Vec<String> = as_object(&upstream, "users")?.keys().cloned().collect();
    Ok(json!({ "users": users }))
}

pub fn connections_payload(upstream: Value) -> Value {
    json!({ "connections": upstream })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub hostname: String,
    pub active: u64,
}

/// Flatten the connections map (keyed by identifier) into a list of summaries.
pub fn connection_summaries(upstream: &Value) -> Result<Vec<ConnectionSummary>, FetchError> {
    let connections = as_object(upstream, "connections")?;
    Ok(connections
        .iter()
        .map(|(id, connection)| ConnectionSummary {
            id: id.clone(),
            name: string_field(connection, "name"),
            protocol: string_field(connection, "protocol"),
            hostname: connection
                .get("attributes")
                .and_then(|attributes| attributes.get(HOSTNAME_ATTRIBUTE))
                .and_then(Value::as_str)
                .filter(|hostname| !hostname.is_empty())
                .unwrap_or(HOSTNAME_MISSING)
                .to_owned(),
            active: connection
                .get("activeConnections")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        })
        .collect())
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, FetchError> {
    value.as_object().ok_or_else(|| {
        FetchError::UnexpectedPayload(format!("{} payload is not a JSON object", what))
    })
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}
