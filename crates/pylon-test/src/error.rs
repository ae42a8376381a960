//! Test error types.

use pylon_core::PylonError;
use thiserror::Error;

/// Errors raised while sending a test request.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be built.
    #[error("request build error: {0}")]
    RequestBuild(#[source] PylonError),

    /// The pipeline returned `Err` instead of a response.
    #[error("pipeline failed: {0}")]
    Pipeline(#[source] PylonError),

    /// The body is not valid UTF-8.
    #[error("body is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
