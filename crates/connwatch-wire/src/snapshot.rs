//! Snapshot payload codec.
//!
//! Upstream proxies speak a loose camelCase JSON dialect, so decoding walks a
//! `serde_json::Value` and keeps whatever is usable instead of rejecting the
//! whole snapshot over one odd record.

use std::collections::BTreeMap;

use connwatch_types::{ConnectionId, RawConnection, SnapshotMessage, StartTime};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

use crate::WireError;

pub fn decode_snapshot_payload(payload: &[u8]) -> Result<Option<SnapshotMessage>, WireError> {
    let value: JsonValue =
        serde_json::from_slice(payload).map_err(|e| WireError::Json(e.to_string()))?;
    let fields = match value {
        JsonValue::Null => return Ok(None),
        JsonValue::Object(fields) => fields,
        other => {
            return Err(WireError::Shape(format!(
                "expected object or null, got {}",
                json_kind(&other)
            )));
        }
    };

    let connections = match fields.get("connections") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Array(records)) => {
            Some(records.iter().filter_map(decode_connection).collect())
        }
        Some(other) => {
            return Err(WireError::Shape(format!(
                "`connections` must be an array, got {}",
                json_kind(other)
            )));
        }
    };

    Ok(Some(SnapshotMessage {
        connections,
        upload_total: optional_counter(&fields, "uploadTotal").unwrap_or(0),
        download_total: optional_counter(&fields, "downloadTotal").unwrap_or(0),
    }))
}

pub fn encode_snapshot_payload(message: Option<&SnapshotMessage>) -> Result<Vec<u8>, WireError> {
    let value = match message {
        None => JsonValue::Null,
        Some(message) => {
            let mut fields = JsonMap::new();
            if let Some(connections) = &message.connections {
                fields.insert(
                    "connections".into(),
                    JsonValue::Array(connections.iter().map(encode_connection).collect()),
                );
            }
            fields.insert("uploadTotal".into(), json!(message.upload_total));
            fields.insert("downloadTotal".into(), json!(message.download_total));
            JsonValue::Object(fields)
        }
    };
    serde_json::to_vec(&value).map_err(|e| WireError::Json(e.to_string()))
}

fn decode_connection(value: &JsonValue) -> Option<RawConnection> {
    let fields = value.as_object()?;
    let id = fields.get("id").and_then(JsonValue::as_str)?;

    let metadata: BTreeMap<String, String> = fields
        .get("metadata")
        .and_then(JsonValue::as_object)
        .map(|meta| {
            meta.iter()
                .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_owned())))
                .collect()
        })
        .unwrap_or_default();

    let chains = fields
        .get("chains")
        .and_then(JsonValue::as_array)
        .map(|chains| {
            chains
                .iter()
                .filter_map(|chain| chain.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default();

    Some(RawConnection {
        id: ConnectionId::new(id),
        metadata,
        chains,
        download: optional_counter(fields, "download"),
        upload: optional_counter(fields, "upload"),
        start: StartTime::new(optional_text(fields, "start").unwrap_or_default()),
        rule: optional_text(fields, "rule"),
        rule_payload: optional_text(fields, "rulePayload"),
    })
}

fn encode_connection(conn: &RawConnection) -> JsonValue {
    let mut fields = JsonMap::new();
    fields.insert("id".into(), json!(conn.id.as_str()));
    fields.insert("metadata".into(), json!(conn.metadata));
    fields.insert("chains".into(), json!(conn.chains));
    fields.insert("download".into(), json!(conn.download));
    fields.insert("upload".into(), json!(conn.upload));
    fields.insert("start".into(), json!(conn.start.as_str()));
    if let Some(rule) = &conn.rule {
        fields.insert("rule".into(), json!(rule));
    }
    if let Some(payload) = &conn.rule_payload {
        fields.insert("rulePayload".into(), json!(payload));
    }
    JsonValue::Object(fields)
}

/// Integral byte counter. Floats are truncated; anything non-numeric is `None`.
fn optional_counter(fields: &JsonMap<String, JsonValue>, field: &str) -> Option<i64> {
    let raw = fields.get(field)?;
    if let Some(value) = raw.as_i64() {
        return Some(value);
    }
    raw.as_f64().filter(|value| value.is_finite()).map(|value| value as i64)
}

fn optional_text(fields: &JsonMap<String, JsonValue>, field: &str) -> Option<String> {
    fields
        .get(field)
        .and_then(JsonValue::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
