//! Exception mappers.

use pylon_core::{PylonError, PylonResult, ResponseDescriptor};

/// Turns a failure into a response.
///
/// A mapper is registered for one [`ErrorType`](pylon_core::ErrorType) and
/// also catches its descendants, unless a mapper closer in the ancestry
/// claims them first. If the mapper itself fails, the failure is logged and
/// the built-in taxonomy answers instead.
///
/// Closures implement the trait directly:
///
/// ```
/// use pylon_core::{PylonError, ResponseDescriptor};
/// use pylon_pipeline::ExceptionMapper;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let mapper = |err: &PylonError| {
///     Ok(ResponseDescriptor::status(StatusCode::UNPROCESSABLE_ENTITY)
///         .entity(json!({ "reason": err.message() })))
/// };
/// let response = mapper.to_response(&PylonError::bad_request("too short")).unwrap();
/// assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
/// ```
pub trait ExceptionMapper: Send + Sync + 'static {
    /// Builds the response for `error`.
    fn to_response(&self, error: &PylonError) -> PylonResult<ResponseDescriptor>;
}

impl<F> ExceptionMapper for F
where
    F: Fn(&PylonError) -> PylonResult<ResponseDescriptor> + Send + Sync + 'static,
{
    fn to_response(&self, error: &PylonError) -> PylonResult<ResponseDescriptor> {
        self(error)
    }
}
