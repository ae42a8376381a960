//! Error types for Pylon.
//!
//! Every failure that crosses a pipeline phase is a [`PylonError`]. Its
//! classification is an [`ErrorType`]: a named node in a static ancestry tree.
//! Exception mappers are registered against an `ErrorType`, and lookup walks
//! the ancestry to find the nearest registered mapper.
//!
//! # Built-in hierarchy
//!
//! ```text
//! failure
//! ├── framework
//! │   └── web_application
//! │       ├── redirection
//! │       ├── client_error
//! │       │   ├── bad_request
//! │       │   │   └── param_conversion
//! │       │   ├── not_authorized
//! │       │   ├── forbidden
//! │       │   ├── not_found
//! │       │   ├── not_allowed
//! │       │   ├── not_acceptable
//! │       │   └── not_supported
//! │       └── server_error
//! │           ├── internal_server_error
//! │           └── service_unavailable
//! └── illegal_state
//! ```
//!
//! Applications extend the tree with their own `static` nodes:
//!
//! ```
//! use pylon_core::{ErrorType, PylonError};
//!
//! static OUT_OF_STOCK: ErrorType = ErrorType::new("out_of_stock", &ErrorType::FAILURE);
//!
//! let err = PylonError::new(&OUT_OF_STOCK, "widget 7 is sold out");
//! assert!(err.is(&OUT_OF_STOCK));
//! assert!(err.is(&ErrorType::FAILURE));
//! assert!(!err.is(&ErrorType::CLIENT_ERROR));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, ALLOW, LOCATION};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PylonError`].
pub type PylonResult<T> = Result<T, PylonError>;

/// A node in the failure-type ancestry tree.
///
/// Two nodes are equal when their names are equal, so names must be unique
/// across an application.
#[derive(Clone, Copy)]
pub struct ErrorType {
    name: &'static str,
    parent: Option<&'static ErrorType>,
}

impl ErrorType {
    /// Root of every failure.
    pub const FAILURE: Self = Self::root("failure");
    /// Failures raised by the framework itself.
    pub const FRAMEWORK: Self = Self::new("framework", &Self::FAILURE);
    /// Failures that carry an HTTP response intent.
    pub const WEB_APPLICATION: Self = Self::new("web_application", &Self::FRAMEWORK);
    /// A redirect request (307).
    pub const REDIRECTION: Self = Self::new("redirection", &Self::WEB_APPLICATION);
    /// Generic 4xx.
    pub const CLIENT_ERROR: Self = Self::new("client_error", &Self::WEB_APPLICATION);
    /// Malformed request (400).
    pub const BAD_REQUEST: Self = Self::new("bad_request", &Self::CLIENT_ERROR);
    /// A parameter value could not be coerced to its declared type (400).
    pub const PARAM_CONVERSION: Self = Self::new("param_conversion", &Self::BAD_REQUEST);
    /// Missing or invalid credentials (401).
    pub const NOT_AUTHORIZED: Self = Self::new("not_authorized", &Self::CLIENT_ERROR);
    /// Authenticated but not permitted (403).
    pub const FORBIDDEN: Self = Self::new("forbidden", &Self::CLIENT_ERROR);
    /// No such resource (404).
    pub const NOT_FOUND: Self = Self::new("not_found", &Self::CLIENT_ERROR);
    /// Method not supported by the matched path (405).
    pub const NOT_ALLOWED: Self = Self::new("not_allowed", &Self::CLIENT_ERROR);
    /// No acceptable response media type (406).
    pub const NOT_ACCEPTABLE: Self = Self::new("not_acceptable", &Self::CLIENT_ERROR);
    /// Request media type not consumed (415).
    pub const NOT_SUPPORTED: Self = Self::new("not_supported", &Self::CLIENT_ERROR);
    /// Generic 5xx.
    pub const SERVER_ERROR: Self = Self::new("server_error", &Self::WEB_APPLICATION);
    /// Internal failure (500).
    pub const INTERNAL_SERVER_ERROR: Self =
        Self::new("internal_server_error", &Self::SERVER_ERROR);
    /// Temporarily unavailable (503).
    pub const SERVICE_UNAVAILABLE: Self = Self::new("service_unavailable", &Self::SERVER_ERROR);
    /// An operation was called in a phase that does not permit it.
    pub const ILLEGAL_STATE: Self = Self::new("illegal_state", &Self::FAILURE);

    /// Creates a root node with no parent.
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Creates a node below `parent`.
    #[must_use]
    pub const fn new(name: &'static str, parent: &'static ErrorType) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// The node name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The direct parent, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&'static ErrorType> {
        self.parent
    }

    /// Number of parent links from `self` up to `ancestor`.
    ///
    /// `Some(0)` for the node itself, `None` if `ancestor` is not on the chain.
    #[must_use]
    pub fn distance_to(&self, ancestor: &ErrorType) -> Option<usize> {
        let mut current = Some(self);
        let mut distance = 0;
        while let Some(node) = current {
            if node == ancestor {
                return Some(distance);
            }
            current = node.parent;
            distance += 1;
        }
        None
    }

    /// Returns `true` if `self` is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &ErrorType) -> bool {
        self.distance_to(other).is_some()
    }

    /// Iterates from `self` to the root.
    pub fn ancestry(&self) -> impl Iterator<Item = &ErrorType> {
        std::iter::successors(Some(self), |node| node.parent)
    }
}

impl PartialEq for ErrorType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ErrorType {}

impl std::hash::Hash for ErrorType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The standard error type for Pylon.
///
/// A `PylonError` carries its [`ErrorType`] plus an optional response
/// intent: a status override, extra headers and an entity. The entity is
/// used verbatim by the built-in resolver when no mapper handles the error.
/// Arbitrary typed details can be attached for mappers to inspect.
///
/// # Example
///
/// ```
/// use pylon_core::{ErrorType, PylonError};
/// use http::StatusCode;
///
/// let err = PylonError::not_found("widget 7 does not exist");
/// assert_eq!(err.error_type(), &ErrorType::NOT_FOUND);
/// assert_eq!(err.to_string(), "widget 7 does not exist");
///
/// let err = PylonError::web_application(StatusCode::CONFLICT, "version mismatch");
/// assert_eq!(err.status(), Some(StatusCode::CONFLICT));
/// ```
#[derive(Error)]
#[error("{message}")]
pub struct PylonError {
    error_type: ErrorType,
    message: String,
    status: Option<StatusCode>,
    headers: HeaderMap,
    entity: Option<serde_json::Value>,
    #[source]
    source: Option<anyhow::Error>,
    detail: Option<Arc<dyn Any + Send + Sync>>,
}

impl PylonError {
    /// Creates an error of the given type.
    #[must_use]
    pub fn new(error_type: &ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type: *error_type,
            message: message.into(),
            status: None,
            headers: HeaderMap::new(),
            entity: None,
            source: None,
            detail: None,
        }
    }

    /// A failure with no specific category.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::FAILURE, message)
    }

    /// A web-application failure with an explicit status.
    #[must_use]
    pub fn web_application(status: StatusCode, message: impl Into<String>) -> Self {
        let error_type = if status.is_client_error() {
            ErrorType::CLIENT_ERROR
        } else if status.is_redirection() {
            ErrorType::REDIRECTION
        } else if status.is_server_error() {
            ErrorType::SERVER_ERROR
        } else {
            ErrorType::WEB_APPLICATION
        };
        Self::new(&error_type, message).with_status(status)
    }

    /// 404.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::NOT_FOUND, message)
    }

    /// 400.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::BAD_REQUEST, message)
    }

    /// 400, raised when a parameter value cannot be coerced.
    #[must_use]
    pub fn param_conversion(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::PARAM_CONVERSION, message)
    }

    /// 401.
    #[must_use]
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::NOT_AUTHORIZED, message)
    }

    /// 403.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::FORBIDDEN, message)
    }

    /// 405 with an `Allow` header.
    #[must_use]
    pub fn not_allowed(message: impl Into<String>, allow: &str) -> Self {
        let err = Self::new(&ErrorType::NOT_ALLOWED, message);
        match HeaderValue::from_str(allow) {
            Ok(value) => err.with_header(ALLOW, value),
            Err(_) => err,
        }
    }

    /// 406.
    #[must_use]
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::NOT_ACCEPTABLE, message)
    }

    /// 415.
    #[must_use]
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::NOT_SUPPORTED, message)
    }

    /// 500.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::INTERNAL_SERVER_ERROR, message)
    }

    /// 500 with an underlying cause that is logged but never sent.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::internal(message).with_source(source)
    }

    /// 503.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::SERVICE_UNAVAILABLE, message)
    }

    /// 307 to `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let err = Self::new(&ErrorType::REDIRECTION, format!("redirect to {location}"));
        match HeaderValue::from_str(location) {
            Ok(value) => err.with_header(LOCATION, value),
            Err(_) => err,
        }
    }

    /// Operation not permitted in the current phase.
    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(&ErrorType::ILLEGAL_STATE, message)
    }

    /// Overrides the status the built-in resolver would pick.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the response entity sent instead of the error envelope.
    #[must_use]
    pub fn with_entity(mut self, entity: serde_json::Value) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a typed payload for mappers.
    #[must_use]
    pub fn with_detail<T: Any + Send + Sync>(mut self, detail: T) -> Self {
        self.detail = Some(Arc::new(detail));
        self
    }

    /// The failure classification.
    #[must_use]
    pub const fn error_type(&self) -> &ErrorType {
        &self.error_type
    }

    /// Returns `true` if this error is `error_type` or descends from it.
    #[must_use]
    pub fn is(&self, error_type: &ErrorType) -> bool {
        self.error_type.is_a(error_type)
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The status override, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Extra response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The explicit response entity, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<&serde_json::Value> {
        self.entity.as_ref()
    }

    /// The typed payload, if one of type `T` was attached.
    #[must_use]
    pub fn detail<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.detail.as_deref().and_then(|d| d.downcast_ref::<T>())
    }

    /// The underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }
}

impl fmt::Debug for PylonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PylonError")
            .field("error_type", &self.error_type)
            .field("message", &self.message)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("entity", &self.entity)
            .field("source", &self.source)
            .field("detail", &self.detail.is_some())
            .finish()
    }
}

impl From<anyhow::Error> for PylonError {
    fn from(source: anyhow::Error) -> Self {
        Self::failure(source.to_string()).with_source(source)
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, the upper-cased [`ErrorType`] name.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Numeric HTTP status.
    pub status: u16,
}

impl ErrorEnvelope {
    /// Builds an envelope for `error` answered with `status`.
    ///
    /// Messages of 5xx errors are replaced unless `expose_internal` is set.
    #[must_use]
    pub fn new(
        error: &PylonError,
        status: StatusCode,
        request_id: Option<&str>,
        expose_internal: bool,
    ) -> Self {
        let message = if status.is_server_error() && !expose_internal {
            "An internal error occurred".to_string()
        } else {
            error.message().to_string()
        };
        Self {
            error: ErrorDetail {
                code: error.error_type().name().to_ascii_uppercase(),
                message,
                status: status.as_u16(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static OUT_OF_STOCK: ErrorType = ErrorType::new("out_of_stock", &ErrorType::BAD_REQUEST);

    #[test]
    fn test_ancestry_distance() {
        assert_eq!(ErrorType::PARAM_CONVERSION.distance_to(&ErrorType::PARAM_CONVERSION), Some(0));
        assert_eq!(ErrorType::PARAM_CONVERSION.distance_to(&ErrorType::BAD_REQUEST), Some(1));
        assert_eq!(ErrorType::PARAM_CONVERSION.distance_to(&ErrorType::CLIENT_ERROR), Some(2));
        assert_eq!(ErrorType::PARAM_CONVERSION.distance_to(&ErrorType::FAILURE), Some(5));
        assert_eq!(ErrorType::PARAM_CONVERSION.distance_to(&ErrorType::SERVER_ERROR), None);
    }

    #[test]
    fn test_custom_type_extends_builtin() {
        assert!(OUT_OF_STOCK.is_a(&ErrorType::BAD_REQUEST));
        assert!(!ErrorType::BAD_REQUEST.is_a(&OUT_OF_STOCK));
        let chain: Vec<_> = OUT_OF_STOCK.ancestry().map(ErrorType::name).collect();
        assert_eq!(
            chain,
            vec![
                "out_of_stock",
                "bad_request",
                "client_error",
                "web_application",
                "framework",
                "failure"
            ]
        );
    }

    #[test]
    fn test_web_application_picks_family() {
        let err = PylonError::web_application(StatusCode::IM_A_TEAPOT, "short and stout");
        assert!(err.is(&ErrorType::CLIENT_ERROR));
        assert_eq!(err.status(), Some(StatusCode::IM_A_TEAPOT));

        let err = PylonError::web_application(StatusCode::BAD_GATEWAY, "upstream");
        assert!(err.is(&ErrorType::SERVER_ERROR));

        let err = PylonError::web_application(StatusCode::PERMANENT_REDIRECT, "moved");
        assert!(err.is(&ErrorType::REDIRECTION));
    }

    #[test]
    fn test_not_allowed_carries_allow_header() {
        let err = PylonError::not_allowed("nope", "GET, HEAD");
        assert_eq!(err.headers().get(ALLOW).unwrap(), "GET, HEAD");
    }

    #[test]
    fn test_redirect_carries_location() {
        let err = PylonError::redirect("/elsewhere");
        assert!(err.is(&ErrorType::REDIRECTION));
        assert_eq!(err.headers().get(LOCATION).unwrap(), "/elsewhere");
    }

    #[test]
    fn test_detail_downcast() {
        #[derive(Debug, PartialEq)]
        struct Sku(u32);

        let err = PylonError::new(&OUT_OF_STOCK, "gone").with_detail(Sku(7));
        assert_eq!(err.detail::<Sku>(), Some(&Sku(7)));
        assert!(err.detail::<String>().is_none());
    }

    #[test]
    fn test_source_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = PylonError::internal_with_source("storage failed", io);
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_envelope_hides_internal_messages() {
        let err = PylonError::internal("db password is hunter2");
        let hidden = ErrorEnvelope::new(&err, StatusCode::INTERNAL_SERVER_ERROR, Some("r1"), false);
        assert_eq!(hidden.error.message, "An internal error occurred");
        assert_eq!(hidden.error.code, "INTERNAL_SERVER_ERROR");

        let shown = ErrorEnvelope::new(&err, StatusCode::INTERNAL_SERVER_ERROR, None, true);
        assert_eq!(shown.error.message, "db password is hunter2");

        let json = serde_json::to_string(&hidden).unwrap();
        assert!(json.contains("\"request_id\":\"r1\""));
        assert!(json.contains("\"status\":500"));
    }

    #[test]
    fn test_envelope_keeps_client_messages() {
        let err = PylonError::bad_request("id must be a number");
        let env = ErrorEnvelope::new(&err, StatusCode::BAD_REQUEST, None, false);
        assert_eq!(env.error.message, "id must be a number");
        assert!(env.request_id.is_none());
    }
}
