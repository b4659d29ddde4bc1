//! # JSON-RPC 2.0 Dispatch
//!
//! A transport-agnostic JSON-RPC 2.0 dispatch core. Feed it a raw payload and a
//! method registry; get back the response to send, or nothing at all.
//!
//! ## Features
//! - Request validation against a JSON Schema (pluggable)
//! - Batches, with per-item failures and order-preserving concurrent execution
//! - Positional and keyword argument binding against declared signatures
//! - Host-supplied context injected into methods that ask for it
//! - Panics and method faults converted to protocol errors
//! - Cancellation propagated to the host instead of being answered
//!
//! ```rust,no_run
//! use turul_json_rpc_dispatch::prelude::*;
//!
//! # async fn run() -> Result<(), Cancelled> {
//! let methods = Methods::new().with(sync_method(
//!     "subtract",
//!     Signature::positional(["minuend", "subtrahend"]),
//!     |args: Arguments<()>| {
//!         Ok(Outcome::success(args.parse::<i64>("minuend")? - args.parse::<i64>("subtrahend")?))
//!     },
//! ));
//!
//! let reply = dispatch_to_json(
//!     r#"{"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":1}"#,
//!     &methods,
//!     None::<()>,
//! )
//! .await?;
//! assert_eq!(reply.as_deref(), Some(r#"{"jsonrpc":"2.0","result":19,"id":1}"#));
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod outcome;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod types;
pub mod validator;

// Re-export main types
pub use binder::{Arguments, Param, Signature, bind};
pub use config::DispatchConfig;
pub use dispatch::{Dispatcher, dispatch, dispatch_to_json};
pub use error::{
    BindError, Cancelled, ConfigError, ErrorCode, ErrorObject, MethodError, RequestError,
};
pub use invoker::invoke;
pub use outcome::{MethodResult, Outcome};
pub use registry::{MethodLookup, MethodRef, Methods, RpcMethod, method, sync_method};
pub use request::{Params, Request};
pub use response::{BatchResponse, ErrorResponse, Response, SuccessResponse};
pub use types::{JsonRpcVersion, RequestId};
pub use validator::{JsonDecoder, RequestDecoder, RequestValidator, SchemaValidator};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    // Reserved for the protocol; applications must not use these
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
