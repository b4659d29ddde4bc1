//! Payload decoding and request schema validation
//!
//! Both are pluggable collaborators of the dispatcher. Closures with the
//! matching signature implement the traits directly.

use jsonschema::Validator;
use serde_json::{Value, json};

/// Turns a raw payload into a JSON value
pub trait RequestDecoder: Send + Sync {
    fn decode(&self, raw: &str) -> Result<Value, String>;
}

impl<F> RequestDecoder for F
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync,
{
    fn decode(&self, raw: &str) -> Result<Value, String> {
        self(raw)
    }
}

/// Default decoder backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl RequestDecoder for JsonDecoder {
    fn decode(&self, raw: &str) -> Result<Value, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

/// Checks that one JSON value has the shape of a JSON-RPC request
pub trait RequestValidator: Send + Sync {
    fn validate(&self, request: &Value) -> Result<(), String>;
}

impl<F> RequestValidator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, request: &Value) -> Result<(), String> {
        self(request)
    }
}

/// JSON Schema for a single request object
pub fn request_schema(strict_version: bool) -> Value {
    let required = if strict_version {
        json!(["jsonrpc", "method"])
    } else {
        json!(["method"])
    };
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "description": "A JSON-RPC 2.0 request or notification",
        "type": "object",
        "required": required,
        "properties": {
            "jsonrpc": {"const": "2.0"},
            "method": {"type": "string", "minLength": 1},
            "params": {"type": ["array", "object"]},
            "id": {"type": ["string", "number", "null"]}
        }
    })
}

/// Default validator: compiled request JSON Schema
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    pub fn new(strict_version: bool) -> Result<Self, String> {
        Self::from_schema(&request_schema(strict_version))
    }

    /// Compile a custom request schema
    pub fn from_schema(schema: &Value) -> Result<Self, String> {
        let validator = Validator::new(schema).map_err(|e| e.to_string())?;
        Ok(Self { validator })
    }
}

impl RequestValidator for SchemaValidator {
    fn validate(&self, request: &Value) -> Result<(), String> {
        match self.validator.iter_errors(request).next() {
            None => Ok(()),
            Some(error) => Err(error.to_string()),
        }
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}
