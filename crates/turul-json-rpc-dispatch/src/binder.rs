//! Argument binding
//!
//! Every registered method carries a [`Signature`] describing its parameter
//! shape. [`bind`] matches a request's params against it and produces the
//! [`Arguments`] handed to the method body.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{BindError, MethodError};
use crate::request::Params;

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// `None` means the parameter is required
    pub default: Option<Value>,
}

impl Param {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Parameter shape of a callable, built once at registration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
    variadic_positional: bool,
    variadic_keyword: bool,
    context: bool,
}

impl Signature {
    /// A method taking no arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a signature made only of required parameters
    pub fn positional<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(Self::new(), |signature, name| signature.required(name))
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Accept any number of extra positional arguments
    pub fn variadic_positional(mut self) -> Self {
        self.variadic_positional = true;
        self
    }

    /// Accept arbitrary extra keyword arguments
    pub fn variadic_keyword(mut self) -> Self {
        self.variadic_keyword = true;
        self
    }

    /// The method receives the host-supplied context
    pub fn with_context(mut self) -> Self {
        self.context = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn takes_context(&self) -> bool {
        self.context
    }

    pub fn accepts_extra_positional(&self) -> bool {
        self.variadic_positional
    }

    pub fn accepts_extra_keywords(&self) -> bool {
        self.variadic_keyword
    }
}

/// Arguments bound to a method call
#[derive(Debug, Clone)]
pub struct Arguments<C> {
    values: Vec<(String, Value)>,
    rest: Vec<Value>,
    extra: Map<String, Value>,
    context: Option<C>,
}

impl<C> Arguments<C> {
    /// Value bound to a declared parameter (defaults included)
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Deserialize a declared parameter, or an extra keyword argument.
    ///
    /// A missing or mistyped argument is reported as invalid params.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T, MethodError> {
        let Some(value) = self.get(name).or_else(|| self.extra.get(name)) else {
            let message = format!("missing argument '{}'", name);
            return Err(MethodError::invalid_params(message));
        };
        let invalid = |e: serde_json::Error| {
            MethodError::invalid_params(format!("argument '{}': {}", name, e))
        };
        serde_json::from_value(value.clone()).map_err(invalid)
    }

    /// Declared parameters in declaration order
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Extra positional arguments (variadic methods only)
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Extra keyword arguments (variadic-keyword methods only)
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Host context, present when the signature declares it
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }
}

/// Bind request params to a method signature
pub fn bind<C>(
    params: Params,
    signature: &Signature,
    context: Option<C>,
) -> Result<Arguments<C>, BindError> {
    let context = if signature.context {
        Some(context.ok_or(BindError::MissingContext)?)
    } else {
        None
    };

    let declared = &signature.params;
    let mut slots: Vec<Option<Value>> = vec![None; declared.len()];
    let mut rest = Vec::new();
    let mut extra = Map::new();

    match params {
        Params::None => {}
        Params::Positional(values) => {
            let got = values.len();
            if got > declared.len() && !signature.variadic_positional {
                return Err(BindError::TooManyPositional {
                    expected: declared.len(),
                    got,
                });
            }
            let mut values = values.into_iter();
            for (slot, value) in slots.iter_mut().zip(values.by_ref()) {
                *slot = Some(value);
            }
            rest.extend(values);
        }
        Params::Keyword(map) => {
            for (key, value) in map {
                match declared.iter().position(|param| param.name == key) {
                    Some(index) => slots[index] = Some(value),
                    None if signature.variadic_keyword => {
                        extra.insert(key, value);
                    }
                    None => return Err(BindError::UnexpectedKeyword(key)),
                }
            }
        }
    }

    let values = declared
        .iter()
        .zip(slots)
        .map(|(param, slot)| {
            slot.or_else(|| param.default.clone())
                .map(|value| (param.name.clone(), value))
                .ok_or_else(|| BindError::MissingArgument(param.name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Arguments {
        values,
        rest,
        extra,
        context,
    })
}
