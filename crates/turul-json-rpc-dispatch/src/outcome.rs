//! Method outcomes
//!
//! A method body reports its result as an [`Outcome`]: either a success value
//! or an explicit application failure. This is distinct from the wire-level
//! [`crate::Response`], which the invoker builds from it.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorObject, MethodError};

/// What a method body returns
pub type MethodResult = Result<Outcome, MethodError>;

/// Tagged success/failure value produced by a method body
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(ErrorObject),
}

impl Outcome {
    pub fn success(value: impl Into<Value>) -> Self {
        Outcome::Success(value.into())
    }

    /// Success with a `null` result
    pub fn null() -> Self {
        Outcome::Success(Value::Null)
    }

    /// Serialize any value into a success outcome.
    ///
    /// A value serde cannot represent as JSON (e.g. a map with non-string
    /// keys) is reported as [`MethodError::InvalidResult`].
    pub fn json<T: Serialize>(value: T) -> MethodResult {
        serde_json::to_value(value)
            .map(Outcome::Success)
            .map_err(|e| MethodError::InvalidResult(e.to_string()))
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Outcome::Failure(ErrorObject::application(code, message))
    }

    /// Failure with the reserved InvalidParams code
    pub fn invalid_params(data: impl Into<Value>) -> Self {
        Outcome::Failure(ErrorObject::invalid_params(Some(data.into())))
    }

    /// Attach `data` to a failure. No effect on a success.
    pub fn with_data(self, data: impl Into<Value>) -> Self {
        match self {
            Outcome::Failure(error) => Outcome::Failure(error.with_data(data)),
            success => success,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<ErrorObject> for Outcome {
    fn from(error: ErrorObject) -> Self {
        Outcome::Failure(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_json_success() {
        let outcome = Outcome::json(vec![1, 2, 3]).unwrap();
        assert_eq!(outcome, Outcome::Success(json!([1, 2, 3])));
    }

    #[test]
    fn test_json_rejects_unrepresentable_value() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON");
        let result = Outcome::json(map);
        assert!(matches!(result, Err(MethodError::InvalidResult(_))));
    }

    #[test]
    fn test_failure_with_data() {
        let why = json!({"why": "because"});
        let outcome = Outcome::failure(42, "Nope").with_data(why.clone());
        match outcome {
            Outcome::Failure(error) => {
                assert_eq!(error.code, 42);
                assert_eq!(error.message, "Nope");
                assert_eq!(error.data, Some(why));
            }
            Outcome::Success(_) => panic!("expected failure"),
        }

        assert_eq!(Outcome::null().with_data(1), Outcome::Success(Value::Null));
    }

    #[test]
    fn test_invalid_params_uses_reserved_code() {
        match Outcome::invalid_params("bad") {
            Outcome::Failure(error) => assert_eq!(error.code, -32602),
            Outcome::Success(_) => panic!("expected failure"),
        }
    }
}
