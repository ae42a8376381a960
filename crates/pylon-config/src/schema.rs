//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// Controls the HTTP transport: bind address, timeouts and connection
/// limits.
///
/// # Example
///
/// ```
/// use pylon_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:8080".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Time allowed to receive a request body and produce a response.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: default_max_connections(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    10000
}

fn default_request_timeout() -> u64 {
    30
}

/// Pipeline configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Send real messages for 5xx errors instead of a generic one.
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Media type used when an operation declares none.
    #[serde(default = "default_media_type")]
    pub default_media_type: String,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            default_media_type: default_media_type(),
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_media_type() -> String {
    "application/json".to_string()
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `pylon_pipeline=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts to the telemetry crate's logging settings.
    #[must_use]
    pub fn to_log_config(&self) -> pylon_telemetry::LogConfig {
        let format = match self.format {
            LogFormat::Json => pylon_telemetry::LogFormat::Json,
            LogFormat::Pretty => pylon_telemetry::LogFormat::Pretty,
        };
        pylon_telemetry::LogConfig::new(self.level.clone(), format)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
