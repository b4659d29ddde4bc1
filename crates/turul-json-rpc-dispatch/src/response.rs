use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{ErrorCode, ErrorObject};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
///
/// Field order is the canonical wire order: `jsonrpc`, `result`, `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    pub id: RequestId,
}

impl SuccessResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

/// A JSON-RPC error response
///
/// `id` is `null` when the request id could not be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: ErrorObject,
    pub id: RequestId,
}

impl ErrorResponse {
    pub fn new(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id: id.unwrap_or(RequestId::Null),
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(None, ErrorObject::parse_error(data))
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(None, ErrorObject::invalid_request(data))
    }

    pub fn method_not_found(id: Option<RequestId>, method: &str) -> Self {
        Self::new(id, ErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: Option<RequestId>, data: Option<Value>) -> Self {
        Self::new(id, ErrorObject::invalid_params(data))
    }

    pub fn internal_error(id: Option<RequestId>, data: Option<Value>) -> Self {
        Self::new(id, ErrorObject::internal_error(data))
    }

    /// HTTP status a transport may use for this error
    pub fn http_status(&self) -> u16 {
        match self.error.kind() {
            ErrorCode::MethodNotFound => 404,
            ErrorCode::InternalError | ErrorCode::ServerError(_) => 500,
            ErrorCode::ParseError
            | ErrorCode::InvalidRequest
            | ErrorCode::InvalidParams
            | ErrorCode::Application(_) => 400,
        }
    }
}

/// Ordered responses to a batch request.
///
/// Never empty and never holds notifications; see [`BatchResponse::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse(Vec<Response>);

impl BatchResponse {
    /// Build a batch, dropping notifications and flattening nested batches.
    ///
    /// Returns `None` when nothing is left to send.
    pub fn new(responses: impl IntoIterator<Item = Response>) -> Option<Self> {
        let mut items = Vec::new();
        for response in responses {
            match response {
                Response::Notification => {}
                Response::Batch(batch) => items.extend(batch.0),
                other => items.push(other),
            }
        }
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn responses(&self) -> &[Response] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Response> {
        self.0
    }
}

/// Result of dispatching a request or batch
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
    /// Nothing to send (the request was a notification)
    Notification,
    Batch(BatchResponse),
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Response::Success(SuccessResponse::new(id, result))
    }

    pub fn error(id: Option<RequestId>, error: ErrorObject) -> Self {
        Response::Error(ErrorResponse::new(id, error))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, Response::Notification)
    }

    /// Id carried by a single response
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Response::Success(response) => Some(&response.id),
            Response::Error(response) => Some(&response.id),
            Response::Notification | Response::Batch(_) => None,
        }
    }

    /// HTTP status hint for transports that want one
    pub fn http_status(&self) -> u16 {
        match self {
            Response::Success(_) | Response::Batch(_) => 200,
            Response::Notification => 204,
            Response::Error(error) => error.http_status(),
        }
    }

    /// Serialized body, `None` when there is nothing to send
    pub fn to_json_string(&self) -> Option<String> {
        match self {
            Response::Notification => None,
            other => serde_json::to_string(other).ok(),
        }
    }
}

impl From<SuccessResponse> for Response {
    fn from(response: SuccessResponse) -> Self {
        Response::Success(response)
    }
}

impl From<ErrorResponse> for Response {
    fn from(response: ErrorResponse) -> Self {
        Response::Error(response)
    }
}

impl From<BatchResponse> for Response {
    fn from(batch: BatchResponse) -> Self {
        Response::Batch(batch)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Response::Success(response) => response.serialize(serializer),
            Response::Error(response) => response.serialize(serializer),
            Response::Notification => serializer.serialize_unit(),
            Response::Batch(batch) => batch.0.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        response_from_value(value).map_err(D::Error::custom)
    }
}

fn response_from_value(value: Value) -> Result<Response, String> {
    match value {
        Value::Null => Ok(Response::Notification),
        Value::Array(items) => {
            let responses = items
                .into_iter()
                .map(|item| match response_from_value(item)? {
                    single @ (Response::Success(_) | Response::Error(_)) => Ok(single),
                    _ => Err("batch items must be single responses".to_string()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            BatchResponse::new(responses)
                .map(Response::Batch)
                .ok_or_else(|| "batch response must not be empty".to_string())
        }
        Value::Object(obj) => {
            let is_error = obj.contains_key("error");
            let is_success = obj.contains_key("result");
            let value = Value::Object(obj);
            if is_error {
                serde_json::from_value(value)
                    .map(Response::Error)
                    .map_err(|e| e.to_string())
            } else if is_success {
                serde_json::from_value(value)
                    .map(Response::Success)
                    .map_err(|e| e.to_string())
            } else {
                Err("response has neither \"result\" nor \"error\"".to_string())
            }
        }
        _ => Err("not a JSON-RPC response".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn test_success_wire_format() {
        let response = Response::success(RequestId::from(1i64), json!(19));
        assert_eq!(
            to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","result":19,"id":1}"#
        );
    }

    #[test]
    fn test_error_wire_format() {
        let id = Some(RequestId::from(1i64));
        let response = Response::Error(ErrorResponse::method_not_found(id, "foo"));
        let expected = concat!(
            r#"{"jsonrpc":"2.0","#,
            r#""error":{"code":-32601,"message":"Method not found","data":"foo"},"#,
            r#""id":1}"#
        );
        assert_eq!(to_string(&response).unwrap(), expected);

        let response = Response::Error(ErrorResponse::parse_error(None));
        assert_eq!(
            to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error"},"id":null}"#
        );
    }

    #[test]
    fn test_big_number_ids_are_echoed_exactly() {
        let id: RequestId = from_str("18446744073709551617").unwrap();
        let response = Response::success(id, json!(true));
        assert_eq!(
            to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","result":true,"id":18446744073709551617}"#
        );
    }

    #[test]
    fn test_round_trip_every_variant() {
        let success = Response::success(RequestId::from("a"), json!({"nested": [1, null]}));
        let null_result = Response::success(RequestId::Null, Value::Null);
        let error = Response::error(
            Some(RequestId::from(2i64)),
            ErrorObject::application(5, "nope").with_data(json!([1])),
        );
        let items = vec![success.clone(), error.clone()];
        let batch = Response::Batch(BatchResponse::new(items).unwrap());

        for response in [success, null_result, error, batch, Response::Notification] {
            let json = to_string(&response).unwrap();
            let parsed: Response = from_str(&json).unwrap();
            assert_eq!(parsed, response, "round trip of {}", json);
        }
    }

    #[test]
    fn test_batch_never_empty() {
        assert!(BatchResponse::new(vec![]).is_none());
        let silent = vec![Response::Notification, Response::Notification];
        assert!(BatchResponse::new(silent).is_none());

        let items = vec![
            Response::Notification,
            Response::success(RequestId::from(1i64), json!(true)),
        ];
        let batch = BatchResponse::new(items).unwrap();
        assert_eq!(batch.len(), 1);

        assert!(from_str::<Response>("[]").is_err());
    }

    #[test]
    fn test_http_status() {
        let cases = [
            (Response::success(RequestId::Null, json!(1)), 200),
            (Response::Notification, 204),
            (ErrorResponse::invalid_request(None).into(), 400),
            (ErrorResponse::method_not_found(None, "x").into(), 404),
            (ErrorResponse::internal_error(None, None).into(), 500),
            (Response::error(None, ErrorObject::application(1, "app")), 400),
        ];
        for (response, status) in cases {
            assert_eq!(response.http_status(), status, "{:?}", response);
        }
    }

    #[test]
    fn test_notification_has_no_body() {
        assert_eq!(Response::Notification.to_json_string(), None);
        assert!(Response::Notification.id().is_none());
    }
}
