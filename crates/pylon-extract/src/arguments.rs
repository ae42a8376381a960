//! Bound operation arguments.

use std::any::{self, Any};

use http::{HeaderMap, Uri};
use pylon_core::{PylonError, PylonResult, SecurityContext};
use pylon_router::Params;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::binding::TypedEntity;

/// URI details of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriInfo {
    /// The request URI after any pre-match rewrite.
    pub uri: Uri,
    /// The request path as received, still percent-encoded and with any
    /// matrix parameters.
    pub path: String,
    /// The matched route template.
    pub template: Option<String>,
    /// Path template captures.
    pub path_params: Params,
    /// Query pairs in arrival order.
    pub query: Vec<(String, String)>,
    /// Matrix parameters of the last path segment.
    pub matrix_params: Params,
}

impl UriInfo {
    /// The first query value for `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One bound argument.
#[derive(Debug, Clone)]
pub enum Argument {
    /// A coerced value, composite object, or decoded entity.
    Value(Value),
    /// URI details.
    Uri(UriInfo),
    /// A copy of the request headers.
    Headers(HeaderMap),
    /// The security context.
    Security(SecurityContext),
}

/// Arguments in declaration order.
///
/// # Example
///
/// ```rust
/// use pylon_extract::{Argument, Arguments};
/// use serde_json::json;
///
/// let mut args = Arguments::new(vec![Argument::Value(json!(42)), Argument::Value(json!(null))], Some(1));
/// assert_eq!(args.get::<i64>(0).unwrap(), 42);
///
/// args.set_body(json!({"name": "gear"}));
/// assert_eq!(args.body_value(), Some(&json!({"name": "gear"})));
/// ```
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Argument>,
    body_index: Option<usize>,
    entity: Option<TypedEntity>,
}

impl Arguments {
    /// Creates arguments with an optional body slot.
    #[must_use]
    pub fn new(values: Vec<Argument>, body_index: Option<usize>) -> Self {
        Self {
            values,
            body_index,
            entity: None,
        }
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the operation takes no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The argument at `index`.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    /// The raw value at `index`, if it is a value argument.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.values.get(index) {
            Some(Argument::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Deserializes the value at `index` into `T`.
    ///
    /// # Errors
    ///
    /// Returns an `internal` error when the slot is missing or has a
    /// different shape. Binding already checked request input, so a mismatch
    /// here is a declaration bug.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> PylonResult<T> {
        let value = self
            .value(index)
            .ok_or_else(|| PylonError::internal(format!("no value argument at index {index}")))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            PylonError::internal_with_source(format!("argument {index} has an unexpected shape"), e)
        })
    }

    /// Index of the body slot, if the operation binds one.
    #[must_use]
    pub const fn body_index(&self) -> Option<usize> {
        self.body_index
    }

    /// The decoded entity.
    #[must_use]
    pub fn body_value(&self) -> Option<&Value> {
        self.body_index.and_then(|i| self.value(i))
    }

    /// Deserializes the decoded entity into `T`.
    ///
    /// # Errors
    ///
    /// Returns `bad_request` when the entity does not have the shape of `T`.
    pub fn body<T: DeserializeOwned>(&self) -> PylonResult<T> {
        let value = self
            .body_value()
            .ok_or_else(|| PylonError::internal("operation has no body binding"))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            PylonError::bad_request(format!("request body does not match: {e}")).with_source(e)
        })
    }

    /// Stores the decoded entity in the body slot. No-op without one.
    pub fn set_body(&mut self, value: Value) {
        if let Some(slot) = self.body_index.and_then(|i| self.values.get_mut(i)) {
            *slot = Argument::Value(value);
        }
    }

    /// Stores the entity converted to the declared body type.
    pub fn set_typed_body(&mut self, entity: TypedEntity) {
        self.entity = Some(entity);
    }

    /// Takes the entity converted by a [`ParameterBinding::body_as`] binding.
    ///
    /// [`ParameterBinding::body_as`]: crate::ParameterBinding::body_as
    ///
    /// # Errors
    ///
    /// Returns an `internal` error when the operation declared no typed body
    /// or declared a type other than `T`, or when the body was already taken.
    pub fn take_body<T: Any>(&mut self) -> PylonResult<T> {
        let entity = self
            .entity
            .take()
            .ok_or_else(|| PylonError::internal("operation has no typed body"))?;
        entity.downcast::<T>().map(|typed| *typed).map_err(|entity| {
            self.entity = Some(entity);
            PylonError::internal(format!(
                "typed body is not a {}",
                any::type_name::<T>()
            ))
        })
    }

    /// The first [`UriInfo`] argument.
    #[must_use]
    pub fn uri_info(&self) -> Option<&UriInfo> {
        self.values.iter().find_map(|a| match a {
            Argument::Uri(info) => Some(info),
            _ => None,
        })
    }

    /// The first headers argument.
    #[must_use]
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.values.iter().find_map(|a| match a {
            Argument::Headers(h) => Some(h),
            _ => None,
        })
    }

    /// The first security argument.
    #[must_use]
    pub fn security(&self) -> Option<&SecurityContext> {
        self.values.iter().find_map(|a| match a {
            Argument::Security(s) => Some(s),
            _ => None,
        })
    }

    /// Iterates over all arguments.
    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.values.iter()
    }
}
