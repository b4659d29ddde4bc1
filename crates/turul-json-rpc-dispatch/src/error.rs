use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

use crate::error_codes;

const RESERVED: RangeInclusive<i64> = error_codes::RESERVED_START..=error_codes::RESERVED_END;
const SERVER_ERRORS: RangeInclusive<i64> =
    error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    /// Application-chosen code outside the reserved band
    Application(i64),
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => error_codes::PARSE_ERROR,
            ErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            ErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            ErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            ErrorCode::ServerError(code) | ErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError(_) => "Server error",
            ErrorCode::Application(_) => "Application error",
        }
    }

    /// Classify a raw integer code
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => ErrorCode::ParseError,
            error_codes::INVALID_REQUEST => ErrorCode::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => ErrorCode::MethodNotFound,
            error_codes::INVALID_PARAMS => ErrorCode::InvalidParams,
            error_codes::INTERNAL_ERROR => ErrorCode::InternalError,
            c if SERVER_ERRORS.contains(&c) => ErrorCode::ServerError(c),
            c => ErrorCode::Application(c),
        }
    }

    /// Whether the code falls in the range JSON-RPC reserves for itself
    pub fn is_reserved(&self) -> bool {
        RESERVED.contains(&self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
///
/// Field order is the wire order: `code`, `message`, `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(ErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(ErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            None,
            Some(Value::String(method.to_string())),
        )
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(ErrorCode::InvalidParams, None, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(ErrorCode::InternalError, None, data)
    }

    /// Error in the implementation-defined server range.
    ///
    /// Codes outside -32099..=-32000 are clamped to the generic -32000.
    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        let code = if SERVER_ERRORS.contains(&code) {
            code
        } else {
            error_codes::SERVER_ERROR_END
        };
        Self::new(
            ErrorCode::ServerError(code),
            Some(message.to_string()),
            data,
        )
    }

    /// Application error with a caller-chosen code
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn kind(&self) -> ErrorCode {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

/// Error a method body may return instead of an [`crate::Outcome`].
///
/// Any `std::error::Error` converts into [`MethodError::Internal`], so method
/// bodies can use `?` freely. A [`Cancelled`] converted this way is still
/// recognised as a cancellation by the invoker.
pub enum MethodError {
    /// The surrounding host cancelled the call. Escapes dispatch untouched.
    Cancelled,
    /// Arguments bound but were semantically wrong (e.g. wrong type)
    InvalidParams(String),
    /// Explicit application error, same as returning `Outcome::Failure`
    Api(ErrorObject),
    /// The body produced something that is not a valid result
    InvalidResult(String),
    /// Unrecognized fault
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl MethodError {
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        MethodError::Api(ErrorObject::application(code, message))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        MethodError::InvalidParams(detail.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message: String = message.into();
        MethodError::Internal(message.into())
    }
}

impl<E> From<E> for MethodError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        MethodError::Internal(Box::new(error))
    }
}

impl From<ErrorObject> for MethodError {
    fn from(error: ErrorObject) -> Self {
        MethodError::Api(error)
    }
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodError::Cancelled => write!(f, "cancelled"),
            MethodError::InvalidParams(detail) => write!(f, "invalid params: {}", detail),
            MethodError::Api(error) => write!(f, "{}", error),
            MethodError::InvalidResult(detail) => {
                write!(f, "method did not return a valid result: {}", detail)
            }
            MethodError::Internal(error) => write!(f, "{}", error),
        }
    }
}

impl fmt::Debug for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodError::Cancelled => f.write_str("Cancelled"),
            MethodError::InvalidParams(d) => f.debug_tuple("InvalidParams").field(d).finish(),
            MethodError::Api(e) => f.debug_tuple("Api").field(e).finish(),
            MethodError::InvalidResult(d) => f.debug_tuple("InvalidResult").field(d).finish(),
            MethodError::Internal(e) => f.debug_tuple("Internal").field(e).finish(),
        }
    }
}

/// The host cancelled an in-flight dispatch.
///
/// This is the only failure `dispatch` reports to its caller; every other
/// fault is turned into a JSON-RPC error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("dispatch cancelled")]
pub struct Cancelled;

/// Reasons a single JSON value is not a valid JSON-RPC request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request must be a JSON object")]
    NotAnObject,

    #[error("missing or unsupported \"jsonrpc\" version (expected \"2.0\")")]
    Version,

    #[error("\"method\" must be a non-empty string")]
    Method,

    #[error("\"params\" must be an array or an object")]
    Params,

    #[error("\"id\" must be a string, number or null")]
    Id,

    #[error("schema validation failed: {0}")]
    Schema(String),
}

/// Reasons request params cannot be bound to a method's signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("too many positional arguments: expected at most {expected}, got {got}")]
    TooManyPositional { expected: usize, got: usize },

    #[error("missing a required argument: '{0}'")]
    MissingArgument(String),

    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),

    #[error("method requires a context but none was supplied")]
    MissingContext,

    #[error("key '{0}' appears more than once after snake_case conversion")]
    DuplicateKey(String),
}

/// Errors loading a dispatch configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::from_code(-32602), ErrorCode::InvalidParams);
        assert_eq!(ErrorCode::from_code(-32050), ErrorCode::ServerError(-32050));
        assert_eq!(ErrorCode::from_code(42), ErrorCode::Application(42));
    }

    #[test]
    fn test_reserved_band() {
        assert!(ErrorCode::InternalError.is_reserved());
        assert!(ErrorCode::ServerError(-32000).is_reserved());
        assert!(ErrorCode::from_code(-32768).is_reserved());
        assert!(!ErrorCode::Application(-31999).is_reserved());
        assert!(!ErrorCode::Application(1).is_reserved());
    }

    #[test]
    fn test_error_object_serialization() {
        let error = ErrorObject::method_not_found("test");
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(
            json,
            r#"{"code":-32601,"message":"Method not found","data":"test"}"#
        );

        let error = ErrorObject::parse_error(None);
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"code":-32700,"message":"Parse error"}"#);
    }

    #[test]
    fn test_server_error_clamps_code() {
        assert_eq!(ErrorObject::server_error(-32010, "busy", None).code, -32010);
        assert_eq!(ErrorObject::server_error(5, "busy", None).code, -32000);
    }

    #[test]
    fn test_method_error_from_std_error() {
        fn parse() -> Result<i64, MethodError> {
            Ok("nope".parse::<i64>()?)
        }
        assert!(matches!(parse(), Err(MethodError::Internal(_))));

        let api: MethodError = ErrorObject::application(7, "teapot")
            .with_data(json!({"x": 1}))
            .into();
        assert!(matches!(api, MethodError::Api(ref e) if e.code == 7));
    }

    #[test]
    fn test_bind_error_messages_name_parameter() {
        let error = BindError::MissingArgument("subtrahend".to_string());
        assert!(error.to_string().contains("subtrahend"));
    }
}
