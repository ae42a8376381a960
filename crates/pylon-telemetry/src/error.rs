//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while installing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to install the metrics recorder.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to install the log subscriber.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The log level directive does not parse.
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),
}
