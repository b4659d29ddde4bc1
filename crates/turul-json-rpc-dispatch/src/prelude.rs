//! # JSON-RPC Dispatch Prelude
//!
//! Convenient re-exports for writing methods and dispatching to them.
//!
//! ```rust
//! use turul_json_rpc_dispatch::prelude::*;
//! ```

// Writing methods
pub use crate::binder::{Arguments, Signature};
pub use crate::error::{ErrorObject, MethodError};
pub use crate::outcome::{MethodResult, Outcome};
pub use crate::registry::{MethodLookup, Methods, RpcMethod, method, sync_method};

// Dispatching
pub use crate::config::DispatchConfig;
pub use crate::dispatch::{Dispatcher, dispatch, dispatch_to_json};
pub use crate::error::Cancelled;
pub use crate::response::Response;
pub use crate::types::RequestId;

// Standard error codes
pub use crate::error_codes::*;
