//! Structured logging for Pylon.
//!
//! Installs a global `tracing-subscriber` registry with an [`EnvFilter`] and
//! either a JSON or a pretty formatting layer. The pipeline logs inside a
//! `pylon.request` span, so every event carries the method, path and
//! request id of the execution that emitted it.
//!
//! # Example
//!
//! ```rust,ignore
//! use pylon_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(operation_id = "get_widget", "Serving");
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line, human-readable output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(TelemetryError::LoggingInit(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. `"info"`, `"pylon_pipeline=debug,info"`).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to log span open and close events.
    pub span_events: bool,

    /// Whether to include file and line.
    pub file_line_info: bool,

    /// Whether to include the target module path.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// A configuration with the given level and format.
    #[must_use]
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
            ..Self::default()
        }
    }

    /// Human-readable output at `debug`, with span events and locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidLevel`] for a bad filter directive and
/// [`TelemetryError::LoggingInit`] if a global subscriber is already set,
/// including by an earlier call to this function.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
        }
    }
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidLevel`] if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidLevel(format!("{filter}: {e}")))
}

/// Field names used by Pylon log events.
pub mod fields {
    /// Request ID.
    pub const REQUEST_ID: &str = "request_id";

    /// Matched operation.
    pub const OPERATION_ID: &str = "operation_id";

    /// HTTP method.
    pub const HTTP_METHOD: &str = "method";

    /// Request path.
    pub const HTTP_PATH: &str = "path";

    /// Response status.
    pub const HTTP_STATUS: &str = "status";

    /// Pipeline phase.
    pub const PHASE: &str = "phase";

    /// Provider name.
    pub const PROVIDER: &str = "provider";

    /// Error type name.
    pub const ERROR_TYPE: &str = "error_type";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.span_events);
        assert_eq!(dev.level, "debug");

        let prod = LogConfig::production();
        assert_eq!(prod.format, LogFormat::Json);
        assert!(!prod.file_line_info);
        assert_eq!(prod.level, "info");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_invalid_level() {
        let err = create_env_filter("pylon=loud").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidLevel(_)));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::new("warn", LogFormat::Json);
        let first = init_logging(&config);
        let second = init_logging(&config);
        // Another test may have installed the subscriber first.
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(TelemetryError::LoggingInit(_))));
    }
}
