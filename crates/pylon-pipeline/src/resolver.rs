//! Exception resolution.
//!
//! A failure becomes a response in two steps. First the registry is asked
//! for a mapper (exact type, then nearest ancestor). When none exists, or
//! the mapper itself fails, the built-in [`TAXONOMY`] picks the status and
//! the body is the standard error envelope.

use http::StatusCode;
use pylon_core::{ErrorEnvelope, ErrorType, MediaType, PylonError, ResponseContext};
use tracing::{debug, error, warn};

use crate::registry::Registry;

/// Built-in status table, checked in order. The first row whose type is an
/// ancestor of (or equal to) the failure's type wins.
pub static TAXONOMY: &[(&ErrorType, StatusCode)] = &[
    (&ErrorType::NOT_FOUND, StatusCode::NOT_FOUND),
    (&ErrorType::BAD_REQUEST, StatusCode::BAD_REQUEST),
    (&ErrorType::NOT_AUTHORIZED, StatusCode::UNAUTHORIZED),
    (&ErrorType::FORBIDDEN, StatusCode::FORBIDDEN),
    (&ErrorType::NOT_ALLOWED, StatusCode::METHOD_NOT_ALLOWED),
    (&ErrorType::NOT_ACCEPTABLE, StatusCode::NOT_ACCEPTABLE),
    (&ErrorType::NOT_SUPPORTED, StatusCode::UNSUPPORTED_MEDIA_TYPE),
    (&ErrorType::INTERNAL_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR),
    (&ErrorType::SERVICE_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE),
    (&ErrorType::CLIENT_ERROR, StatusCode::BAD_REQUEST),
    (&ErrorType::SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR),
    (&ErrorType::REDIRECTION, StatusCode::TEMPORARY_REDIRECT),
    (&ErrorType::FRAMEWORK, StatusCode::INTERNAL_SERVER_ERROR),
];

/// Classifies an error type against [`TAXONOMY`]. Anything unlisted is 500.
///
/// ```
/// use http::StatusCode;
/// use pylon_core::ErrorType;
/// use pylon_pipeline::classify;
///
/// assert_eq!(classify(&ErrorType::PARAM_CONVERSION), StatusCode::BAD_REQUEST);
/// assert_eq!(classify(&ErrorType::ILLEGAL_STATE), StatusCode::INTERNAL_SERVER_ERROR);
/// ```
#[must_use]
pub fn classify(error_type: &ErrorType) -> StatusCode {
    TAXONOMY
        .iter()
        .find(|(row, _)| error_type.is_a(row))
        .map_or(StatusCode::INTERNAL_SERVER_ERROR, |(_, status)| *status)
}

/// The status the taxonomy answers for `error`.
///
/// A web-application failure carrying its own status keeps it.
#[must_use]
pub fn status_for(error: &PylonError) -> StatusCode {
    match error.status() {
        Some(status) if error.is(&ErrorType::WEB_APPLICATION) => status,
        _ => classify(error.error_type()),
    }
}

/// A resolved failure.
#[derive(Debug)]
pub struct Resolution {
    /// The response to send.
    pub response: ResponseContext,
    /// Whether a registered mapper produced it.
    pub mapped: bool,
}

/// Turns failures into responses.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionResolver<'r> {
    registry: &'r Registry,
    expose_internal: bool,
}

impl<'r> ExceptionResolver<'r> {
    /// Creates a resolver over `registry`.
    ///
    /// With `expose_internal`, 5xx envelopes keep the original message.
    #[must_use]
    pub const fn new(registry: &'r Registry, expose_internal: bool) -> Self {
        Self {
            registry,
            expose_internal,
        }
    }

    /// Resolves `error` for the request identified by `request_id`.
    pub fn resolve(&self, error: &PylonError, request_id: &str) -> Resolution {
        if let Some(mapper) = self.registry.find_exception_mapper(error) {
            match mapper.to_response(error) {
                Ok(descriptor) => {
                    debug!(
                        error_type = error.error_type().name(),
                        status = descriptor.status_code().as_u16(),
                        "failure mapped"
                    );
                    pylon_telemetry::metrics::record_exception(error.error_type().name(), true);
                    return Resolution {
                        response: ResponseContext::from(descriptor),
                        mapped: true,
                    };
                }
                Err(mapper_error) => {
                    warn!(
                        error_type = error.error_type().name(),
                        mapper_error = %mapper_error,
                        "exception mapper failed, using built-in status"
                    );
                }
            }
        }

        pylon_telemetry::metrics::record_exception(error.error_type().name(), false);
        Resolution {
            response: self.taxonomy_response(error, request_id),
            mapped: false,
        }
    }

    fn taxonomy_response(&self, error: &PylonError, request_id: &str) -> ResponseContext {
        let status = status_for(error);

        if status.is_server_error() {
            error!(
                error_type = error.error_type().name(),
                status = status.as_u16(),
                failure = ?error,
                "unhandled server error"
            );
        } else {
            debug!(
                error_type = error.error_type().name(),
                status = status.as_u16(),
                message = error.message(),
                "request failed"
            );
        }

        let entity = error.entity().cloned().unwrap_or_else(|| {
            let envelope =
                ErrorEnvelope::new(error, status, Some(request_id), self.expose_internal);
            serde_json::to_value(envelope).unwrap_or_default()
        });

        let mut response = ResponseContext::new(status);
        for (name, value) in error.headers() {
            response.headers_mut().append(name.clone(), value.clone());
        }
        response.set_entity(Some(entity));
        response.set_media_type(Some(MediaType::json()));
        response
    }
}
