//! Safe invocation of a single request
//!
//! lookup -> bind -> call, each step ending in exactly one [`Response`].
//! Only a cancellation escapes as an error.
//!
//! With `convert_camel_case` on, the method name is rewritten before lookup
//! and keyword keys before binding. Keys that collide after rewriting are
//! reported as invalid params.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error};

use crate::binder::bind;
use crate::config::DispatchConfig;
use crate::error::{Cancelled, ErrorCode, ErrorObject, MethodError};
use crate::outcome::Outcome;
use crate::registry::MethodLookup;
use crate::request::{Params, Request, convert_camel_case};
use crate::response::Response;

const INVALID_RESULT: &str = "method did not return a valid result";

/// Route one request through lookup, binding and the method body.
///
/// Notifications yield [`Response::Notification`] unless the call failed and
/// `notification_errors` is enabled, in which case the error is returned
/// with a `null` id.
pub async fn invoke<C, M>(
    request: Request,
    methods: &M,
    context: Option<C>,
    config: &DispatchConfig,
) -> Result<Response, Cancelled>
where
    C: Send + 'static,
    M: MethodLookup<C> + ?Sized,
{
    let Request { method, params, id } = request;
    let method = if config.convert_camel_case {
        convert_camel_case(&method)
    } else {
        method
    };

    let result = call(&method, params, methods, context, config).await?;

    let response = match (result, id) {
        (Ok(_), None) => Response::Notification,
        (Ok(value), Some(id)) => Response::success(id, value),
        (Err(_), None) if !config.notification_errors => Response::Notification,
        (Err(error), id) => Response::error(id, error),
    };
    Ok(response)
}

async fn call<C, M>(
    name: &str,
    params: Params,
    methods: &M,
    context: Option<C>,
    config: &DispatchConfig,
) -> Result<Result<Value, ErrorObject>, Cancelled>
where
    C: Send + 'static,
    M: MethodLookup<C> + ?Sized,
{
    let Some(method) = methods.lookup(name) else {
        debug!("Method not found: {}", name);
        return Ok(Err(ErrorObject::method_not_found(name)));
    };

    let params = if config.convert_camel_case {
        params.into_snake_case()
    } else {
        Ok(params)
    };
    let signature = method.signature();
    let args = match params.and_then(|params| bind(params, signature, context)) {
        Ok(args) => args,
        Err(bind_error) => {
            debug!("Invalid params for {}: {}", name, bind_error);
            let detail = Value::String(bind_error.to_string());
            return Ok(Err(ErrorObject::invalid_params(Some(detail))));
        }
    };

    let outcome = match AssertUnwindSafe(method.call(args)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Method {} panicked: {}", name, message);
            return Ok(Err(internal_error(config, None, message)));
        }
    };

    match outcome {
        Ok(Outcome::Success(value)) => Ok(Ok(value)),
        Ok(Outcome::Failure(error)) | Err(MethodError::Api(error)) => Ok(Err(error)),
        Err(MethodError::Cancelled) => Err(Cancelled),
        Err(MethodError::InvalidParams(detail)) => {
            let detail = Value::String(detail);
            Ok(Err(ErrorObject::invalid_params(Some(detail))))
        }
        Err(MethodError::InvalidResult(detail)) => {
            error!("Method {} returned an invalid result: {}", name, detail);
            Ok(Err(internal_error(config, Some(INVALID_RESULT), detail)))
        }
        Err(MethodError::Internal(fault)) => {
            if fault.downcast_ref::<Cancelled>().is_some() {
                return Err(Cancelled);
            }
            error!("Method {} failed: {}", name, fault);
            Ok(Err(internal_error(config, None, fault.to_string())))
        }
    }
}

/// InternalError object; fault detail only travels in debug mode
fn internal_error(config: &DispatchConfig, summary: Option<&str>, detail: String) -> ErrorObject {
    let data = match (summary, config.debug) {
        (Some(summary), true) => Some(format!("{}: {}", summary, detail)),
        (Some(summary), false) => Some(summary.to_string()),
        (None, true) => Some(detail),
        (None, false) => None,
    };
    ErrorObject::new(ErrorCode::InternalError, None, data.map(Value::String))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "method panicked".to_string()
    }
}
