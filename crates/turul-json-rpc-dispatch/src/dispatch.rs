//! Dispatch pipeline
//!
//! decode -> validate -> fan out -> invoke -> filter & assemble -> serialize.
//! Every stage is total: faults become error responses, and only a
//! cancellation reaches the caller as an error.

use std::sync::Arc;

use futures::future::try_join_all;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::DispatchConfig;
use crate::error::{Cancelled, RequestError};
use crate::invoker::invoke;
use crate::logging::{log_request, log_response};
use crate::registry::MethodLookup;
use crate::request::Request;
use crate::response::{BatchResponse, ErrorResponse, Response};
use crate::validator::{JsonDecoder, RequestDecoder, RequestValidator, SchemaValidator};

/// Sent if a response cannot be serialized at all
const SERIALIZATION_FALLBACK: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// JSON-RPC dispatcher: configuration plus decoding/validation collaborators.
///
/// Holds no per-call state; one instance can serve any number of concurrent
/// dispatches against any registry.
#[derive(Clone)]
pub struct Dispatcher {
    config: DispatchConfig,
    decoder: Arc<dyn RequestDecoder>,
    validator: Option<Arc<dyn RequestValidator>>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        let validator = match SchemaValidator::new(config.strict_version) {
            Ok(validator) => Some(Arc::new(validator) as Arc<dyn RequestValidator>),
            Err(e) => {
                warn!(
                    "Request schema unavailable, using structural validation only: {}",
                    e
                );
                None
            }
        };
        Self {
            config,
            decoder: Arc::new(JsonDecoder),
            validator,
        }
    }

    /// Replace the payload decoder
    pub fn with_decoder(mut self, decoder: impl RequestDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Replace the request validator
    pub fn with_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Skip schema validation; requests are still checked structurally
    pub fn without_validator(mut self) -> Self {
        self.validator = None;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch a raw payload.
    ///
    /// `Ok(None)` means there is nothing to send back (a notification, or a
    /// batch made only of notifications).
    pub async fn dispatch<C, M>(
        &self,
        raw: &str,
        methods: &M,
        context: Option<C>,
    ) -> Result<Option<Response>, Cancelled>
    where
        C: Clone + Send + 'static,
        M: MethodLookup<C> + ?Sized,
    {
        log_request(raw, &self.config);

        let response = match self.decoder.decode(raw) {
            Ok(value) => self.dispatch_value(value, methods, context).await?,
            Err(detail) => {
                debug!("Parse error: {}", detail);
                Some(ErrorResponse::parse_error(self.detail(detail)).into())
            }
        };

        log_response(response.as_ref(), &self.config);
        Ok(response)
    }

    /// Dispatch an already-decoded payload
    pub async fn dispatch_value<C, M>(
        &self,
        value: Value,
        methods: &M,
        context: Option<C>,
    ) -> Result<Option<Response>, Cancelled>
    where
        C: Clone + Send + 'static,
        M: MethodLookup<C> + ?Sized,
    {
        match value {
            Value::Array(items) if items.is_empty() => {
                debug!("Invalid Request: empty batch");
                let detail = self.detail("empty batch".to_string());
                Ok(Some(ErrorResponse::invalid_request(detail).into()))
            }
            Value::Array(items) => {
                debug!("Dispatching batch of {} requests", items.len());
                let responses = if self.config.concurrent_batches {
                    let calls = items
                        .into_iter()
                        .map(|item| self.dispatch_item(item, methods, context.clone()));
                    try_join_all(calls).await?
                } else {
                    let mut responses = Vec::with_capacity(items.len());
                    for item in items {
                        let response = self.dispatch_item(item, methods, context.clone()).await?;
                        responses.push(response);
                    }
                    responses
                };
                Ok(BatchResponse::new(responses).map(Response::Batch))
            }
            single => match self.dispatch_item(single, methods, context).await? {
                Response::Notification => Ok(None),
                response => Ok(Some(response)),
            },
        }
    }

    /// Dispatch and serialize. `Ok(None)` means nothing to send.
    pub async fn dispatch_to_json<C, M>(
        &self,
        raw: &str,
        methods: &M,
        context: Option<C>,
    ) -> Result<Option<String>, Cancelled>
    where
        C: Clone + Send + 'static,
        M: MethodLookup<C> + ?Sized,
    {
        let response = self.dispatch(raw, methods, context).await?;
        Ok(response.map(|response| serialize(&response)))
    }

    /// Synchronous dispatch, driving the pipeline on the current thread
    pub fn dispatch_blocking<C, M>(
        &self,
        raw: &str,
        methods: &M,
        context: Option<C>,
    ) -> Result<Option<Response>, Cancelled>
    where
        C: Clone + Send + 'static,
        M: MethodLookup<C> + ?Sized,
    {
        futures::executor::block_on(self.dispatch(raw, methods, context))
    }

    async fn dispatch_item<C, M>(
        &self,
        item: Value,
        methods: &M,
        context: Option<C>,
    ) -> Result<Response, Cancelled>
    where
        C: Clone + Send + 'static,
        M: MethodLookup<C> + ?Sized,
    {
        match self.parse_request(item) {
            Ok(request) => invoke(request, methods, context, &self.config).await,
            Err(request_error) => {
                debug!("Invalid Request: {}", request_error);
                let detail = self.detail(request_error.to_string());
                Ok(ErrorResponse::invalid_request(detail).into())
            }
        }
    }

    fn parse_request(&self, item: Value) -> Result<Request, RequestError> {
        if let Some(validator) = &self.validator {
            validator.validate(&item).map_err(RequestError::Schema)?;
        }
        Request::from_value(item, &self.config)
    }

    /// Error `data`, present only in debug mode
    fn detail(&self, detail: String) -> Option<Value> {
        self.config.debug.then_some(Value::String(detail))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("schema_validation", &self.validator.is_some())
            .finish()
    }
}

fn serialize(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        SERIALIZATION_FALLBACK.to_string()
    })
}

static DEFAULT_DISPATCHER: Lazy<Dispatcher> = Lazy::new(Dispatcher::default);

/// Dispatch with the default configuration
pub async fn dispatch<C, M>(
    raw: &str,
    methods: &M,
    context: Option<C>,
) -> Result<Option<Response>, Cancelled>
where
    C: Clone + Send + 'static,
    M: MethodLookup<C> + ?Sized,
{
    DEFAULT_DISPATCHER.dispatch(raw, methods, context).await
}

/// Dispatch and serialize with the default configuration
pub async fn dispatch_to_json<C, M>(
    raw: &str,
    methods: &M,
    context: Option<C>,
) -> Result<Option<String>, Cancelled>
where
    C: Clone + Send + 'static,
    M: MethodLookup<C> + ?Sized,
{
    DEFAULT_DISPATCHER
        .dispatch_to_json(raw, methods, context)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{Arguments, Signature};
    use crate::error::MethodError;
    use crate::outcome::{MethodResult, Outcome};
    use crate::registry::{Methods, method, sync_method};
    use crate::types::RequestId;
    use serde_json::json;
    use std::time::Duration;

    const INVALID_REQUEST: &str =
        r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"},"id":null}"#;

    fn subtract(args: Arguments<()>) -> MethodResult {
        let minuend: i64 = args.parse("minuend")?;
        let subtrahend: i64 = args.parse("subtrahend")?;
        Ok(Outcome::success(minuend - subtrahend))
    }

    async fn sleep(args: Arguments<()>) -> MethodResult {
        let ms: u64 = args.parse("ms")?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(Outcome::success(ms))
    }

    fn cancel(_: Arguments<()>) -> MethodResult {
        Err(MethodError::Cancelled)
    }

    fn ping(_: Arguments<()>) -> MethodResult {
        Ok(Outcome::success("pong"))
    }

    fn get_user(args: Arguments<()>) -> MethodResult {
        Ok(Outcome::success(args.parse::<i64>("user_id")?))
    }

    fn methods() -> Methods {
        let subtract_signature = Signature::positional(["minuend", "subtrahend"]);
        Methods::new()
            .with(sync_method("subtract", subtract_signature, subtract))
            .with(method("sleep", Signature::positional(["ms"]), sleep))
            .with(sync_method("cancel", Signature::new(), cancel))
            .with(sync_method("ping", Signature::new(), ping))
    }

    async fn json(dispatcher: &Dispatcher, raw: &str) -> Option<Value> {
        dispatcher
            .dispatch_to_json(raw, &methods(), None::<()>)
            .await
            .unwrap()
            .map(|body| serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn test_single_request() {
        let raw = r#"{"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":1}"#;
        let body = dispatch_to_json(raw, &methods(), None::<()>).await.unwrap();
        let expected = r#"{"jsonrpc":"2.0","result":19,"id":1}"#;
        assert_eq!(body.as_deref(), Some(expected));
    }

    #[tokio::test]
    async fn test_parse_error_short_circuits() {
        let body = dispatch_to_json("{not json", &methods(), None::<()>).await;
        let expected =
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error"},"id":null}"#;
        assert_eq!(body.unwrap().as_deref(), Some(expected));
    }

    #[tokio::test]
    async fn test_debug_mode_includes_detail() {
        let dispatcher = Dispatcher::new(DispatchConfig::default().debug(true));
        let body = json(&dispatcher, "{not json").await.unwrap();
        assert!(body["error"]["data"].is_string());

        let body = json(&dispatcher, "[]").await.unwrap();
        assert_eq!(body["error"]["code"], json!(-32600));
        assert_eq!(body["error"]["data"], json!("empty batch"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_invalid() {
        let body = dispatch_to_json("[]", &methods(), None::<()>).await;
        assert_eq!(body.unwrap().as_deref(), Some(INVALID_REQUEST));
    }

    #[tokio::test]
    async fn test_scalar_payload_is_invalid() {
        let body = json(&Dispatcher::default(), "1").await.unwrap();
        assert_eq!(body["error"]["code"], json!(-32600));
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_under_concurrency() {
        let raw = r#"[
            {"jsonrpc":"2.0","method":"sleep","params":[30],"id":"slow"},
            {"jsonrpc":"2.0","method":"sleep","params":[1],"id":"fast"},
            {"jsonrpc":"2.0","method":"ping"},
            {"foo":"boo"}
        ]"#;
        let body = json(&Dispatcher::default(), raw).await.unwrap();

        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], json!("slow"));
        assert_eq!(items[1]["id"], json!("fast"));
        assert_eq!(items[2]["error"]["code"], json!(-32600));
        assert_eq!(items[2]["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_sequential_batches() {
        let config = DispatchConfig::default().concurrent_batches(false);
        let dispatcher = Dispatcher::new(config);
        let raw = r#"[
            {"jsonrpc":"2.0","method":"ping","id":1},
            {"jsonrpc":"2.0","method":"ping","id":2}
        ]"#;
        let body = json(&dispatcher, raw).await.unwrap();
        assert_eq!(body[0]["id"], json!(1));
        assert_eq!(body[1]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_notification_only_batch_sends_nothing() {
        let dispatcher = Dispatcher::default();
        let raw = r#"[{"jsonrpc":"2.0","method":"ping"},{"jsonrpc":"2.0","method":"missing"}]"#;
        let response = dispatcher.dispatch(raw, &methods(), None::<()>).await;
        assert_eq!(response, Ok(None));

        let raw = r#"{"jsonrpc":"2.0","method":"ping"}"#;
        let response = dispatcher.dispatch(raw, &methods(), None::<()>).await;
        assert_eq!(response, Ok(None));
    }

    #[tokio::test]
    async fn test_cancellation_escapes_batch() {
        let raw = r#"[
            {"jsonrpc":"2.0","method":"ping","id":1},
            {"jsonrpc":"2.0","method":"cancel","id":2}
        ]"#;
        for concurrent in [true, false] {
            let config = DispatchConfig::default().concurrent_batches(concurrent);
            let dispatcher = Dispatcher::new(config);
            let response = dispatcher.dispatch(raw, &methods(), None::<()>).await;
            assert_eq!(response, Err(Cancelled));
        }
    }

    #[tokio::test]
    async fn test_host_can_drop_in_flight_dispatch() {
        let registry = methods();
        let raw = r#"{"jsonrpc":"2.0","method":"sleep","params":[10000],"id":1}"#;
        let dispatcher = Dispatcher::default();
        let in_flight = dispatcher.dispatch(raw, &registry, None::<()>);
        let limit = Duration::from_millis(20);
        let result = tokio::time::timeout(limit, in_flight).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_blocking_dispatch() {
        let raw = r#"{"jsonrpc":"2.0","method":"ping","id":"b"}"#;
        let dispatcher = Dispatcher::default();
        let response = dispatcher.dispatch_blocking(raw, &methods(), None::<()>);
        let expected = Response::success(RequestId::from("b"), json!("pong"));
        assert_eq!(response, Ok(Some(expected)));
    }

    fn strip_prefix(raw: &str) -> Result<Value, String> {
        serde_json::from_str(raw.trim_start_matches("RPC:"))
            .map_err(|e| e.to_string())
    }

    fn forbid(request: &Value) -> Result<(), String> {
        match request.get("method") {
            Some(method) if method == "forbidden" => Err("forbidden".to_string()),
            _ => Ok(()),
        }
    }

    #[tokio::test]
    async fn test_custom_collaborators() {
        let dispatcher = Dispatcher::default()
            .with_decoder(strip_prefix)
            .with_validator(forbid);

        let raw = r#"RPC:{"jsonrpc":"2.0","method":"ping","id":1}"#;
        let body = json(&dispatcher, raw).await.unwrap();
        assert_eq!(body["result"], json!("pong"));

        let raw = r#"{"jsonrpc":"2.0","method":"forbidden","id":1}"#;
        let body = json(&dispatcher, raw).await.unwrap();
        assert_eq!(body["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn test_relaxed_version_and_camel_case() {
        let config = DispatchConfig::default()
            .strict_version(false)
            .convert_camel_case(true);
        let dispatcher = Dispatcher::new(config);
        let user = Signature::new().required("user_id");
        let registry = Methods::new().with(sync_method("get_user", user, get_user));

        let raw = r#"{"method":"getUser","params":{"userId":7},"id":1}"#;
        let response = dispatcher.dispatch(raw, &registry, None::<()>).await;
        let expected = Response::success(RequestId::from(1i64), json!(7));
        assert_eq!(response, Ok(Some(expected)));

        let raw = r#"{"method":"getUser","params":{"userId":7,"user_id":8},"id":2}"#;
        let response = dispatcher.dispatch(raw, &registry, None::<()>).await;
        let Ok(Some(Response::Error(error))) = &response else {
            panic!("expected an error response, got {:?}", response);
        };
        assert_eq!(error.error.code, -32602);
        assert_eq!(error.id, RequestId::from(2i64));
    }
}
