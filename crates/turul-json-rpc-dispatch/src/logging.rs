//! Request/response log lines
//!
//! Inbound payloads are logged on the `turul_json_rpc_dispatch::request`
//! target and outbound responses on `turul_json_rpc_dispatch::response`, so
//! subscribers can filter them independently.

use serde_json::Value;
use tracing::info;

use crate::config::DispatchConfig;
use crate::response::Response;

pub const REQUEST_TARGET: &str = "turul_json_rpc_dispatch::request";
pub const RESPONSE_TARGET: &str = "turul_json_rpc_dispatch::response";

const MAX_STRING_CHARS: usize = 30;
const MAX_LIST_ITEMS: usize = 5;
const ELLIPSIS: &str = "...";

/// Shorten long strings and lists, recursively, for readable log lines
pub fn trim_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_CHARS => {
            let mut trimmed: String = s.chars().take(MAX_STRING_CHARS).collect();
            trimmed.push_str(ELLIPSIS);
            Value::String(trimmed)
        }
        Value::Array(items) => {
            let head = items.iter().take(MAX_LIST_ITEMS);
            let mut trimmed: Vec<Value> = head.map(trim_value).collect();
            if items.len() > MAX_LIST_ITEMS {
                trimmed.push(Value::String(ELLIPSIS.to_string()));
            }
            Value::Array(trimmed)
        }
        Value::Object(map) => {
            let entries = map.iter().map(|(k, v)| (k.clone(), trim_value(v)));
            Value::Object(entries.collect())
        }
        other => other.clone(),
    }
}

/// Log an inbound payload. Unparseable payloads are logged verbatim.
pub(crate) fn log_request(raw: &str, config: &DispatchConfig) {
    if !config.log_requests {
        return;
    }
    let line = if config.trim_log_values {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => trim_value(&value).to_string(),
            Err(_) => raw.to_string(),
        }
    } else {
        raw.to_string()
    };
    info!(target: REQUEST_TARGET, "--> {}", line);
}

/// Log an outbound response, if there is one
pub(crate) fn log_response(response: Option<&Response>, config: &DispatchConfig) {
    if !config.log_responses {
        return;
    }
    let Some(response) = response else {
        return;
    };
    let Ok(value) = serde_json::to_value(response) else {
        return;
    };
    let value = if config.trim_log_values {
        trim_value(&value)
    } else {
        value
    };
    info!(
        target: RESPONSE_TARGET,
        http_status = response.http_status(),
        "<-- {}",
        value
    );
}
