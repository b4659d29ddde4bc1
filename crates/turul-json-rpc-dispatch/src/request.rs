use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::JSONRPC_VERSION;
use crate::config::DispatchConfig;
use crate::error::{BindError, RequestError};
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// No `params` member
    #[default]
    None,
    /// Positional parameters as an array
    Positional(Vec<Value>),
    /// Named parameters as an object
    Keyword(Map<String, Value>),
}

impl Params {
    /// Get a parameter by name (keyword params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Params::Keyword(map) => map.get(key),
            _ => None,
        }
    }

    /// Get a parameter by index (positional params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Params::Positional(vec) => vec.get(index),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(vec) => vec.len(),
            Params::Keyword(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Params::None)
    }

    /// Rewrite keyword keys from camelCase to snake_case, recursively.
    ///
    /// Two keys that convert to the same name are reported as
    /// [`BindError::DuplicateKey`] instead of one silently replacing the other.
    pub fn into_snake_case(self) -> Result<Self, BindError> {
        match self {
            Params::Keyword(map) => Ok(Params::Keyword(convert_keys(map)?)),
            other => Ok(other),
        }
    }

    /// Wire representation, `None` when the member is absent
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Params::None => None,
            Params::Positional(vec) => Some(Value::Array(vec.clone())),
            Params::Keyword(map) => Some(Value::Object(map.clone())),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(vec: Vec<Value>) -> Self {
        Params::Positional(vec)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Keyword(map)
    }
}

/// A parsed JSON-RPC request.
///
/// `id == None` marks a notification. An explicit `"id": null` is kept as
/// `Some(RequestId::Null)` and still receives a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Params,
    pub id: Option<RequestId>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Params, id: Option<RequestId>) -> Self {
        Self {
            method: method.into(),
            params,
            id,
        }
    }

    /// Create a request expecting a response
    pub fn call(method: impl Into<String>, params: Params, id: impl Into<RequestId>) -> Self {
        Self::new(method, params, Some(id.into()))
    }

    /// Create a notification (no `id`)
    pub fn notification(method: impl Into<String>, params: Params) -> Self {
        Self::new(method, params, None)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Validate one deserialized JSON value and build a request from it.
    ///
    /// The `jsonrpc` member must be `"2.0"`; with `strict_version` off it
    /// may also be missing.
    pub fn from_value(value: Value, config: &DispatchConfig) -> Result<Self, RequestError> {
        let Value::Object(mut obj) = value else {
            return Err(RequestError::NotAnObject);
        };

        match obj.remove("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            None if !config.strict_version => {}
            _ => return Err(RequestError::Version),
        }

        let method = match obj.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => return Err(RequestError::Method),
        };

        let params = match obj.remove("params") {
            None => Params::None,
            Some(Value::Array(vec)) => Params::Positional(vec),
            Some(Value::Object(map)) => Params::Keyword(map),
            Some(_) => return Err(RequestError::Params),
        };

        let id = match obj.remove("id") {
            None => None,
            Some(id) => Some(serde_json::from_value(id).map_err(|_| RequestError::Id)?),
        };

        Ok(Self { method, params, id })
    }

    /// Wire representation of this request
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "jsonrpc".to_string(),
            Value::String(JsonRpcVersion::V2_0.as_str().to_string()),
        );
        obj.insert("method".to_string(), Value::String(self.method.clone()));
        if let Some(params) = self.params.to_value() {
            obj.insert("params".to_string(), params);
        }
        if let Some(id) = &self.id {
            obj.insert(
                "id".to_string(),
                serde_json::to_value(id).unwrap_or(Value::Null),
            );
        }
        Value::Object(obj)
    }
}

static WORD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// `getUserName` -> `get_user_name`, `HTTPServer` -> `http_server`
pub fn convert_camel_case(name: &str) -> String {
    let split = WORD_BOUNDARY.replace_all(name, "${1}_${2}");
    LOWER_UPPER.replace_all(&split, "${1}_${2}").to_lowercase()
}

fn convert_keys(map: Map<String, Value>) -> Result<Map<String, Value>, BindError> {
    let mut converted = Map::new();
    for (key, value) in map {
        let key = convert_camel_case(&key);
        if converted.contains_key(&key) {
            return Err(BindError::DuplicateKey(key));
        }
        converted.insert(key, convert_nested(value)?);
    }
    Ok(converted)
}

fn convert_nested(value: Value) -> Result<Value, BindError> {
    match value {
        Value::Object(map) => Ok(Value::Object(convert_keys(map)?)),
        Value::Array(vec) => {
            let items = vec.into_iter().map(convert_nested);
            Ok(Value::Array(items.collect::<Result<_, _>>()?))
        }
        other => Ok(other),
    }
}
