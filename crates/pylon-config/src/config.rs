//! Main configuration types.
//!
//! This module provides the top-level [`PylonConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingConfig, PipelineConfig, ServerConfig};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Complete Pylon configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use pylon_config::PylonConfig;
///
/// let config = PylonConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.pipeline.default_media_type, "application/json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PylonConfig {
    /// Transport configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PylonConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::{PylonConfig, ServerConfig};
    ///
    /// let config = PylonConfig::builder()
    ///     .server(ServerConfig {
    ///         http_addr: "127.0.0.1:3000".to_string(),
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    #[must_use]
    pub fn builder() -> PylonConfigBuilder {
        PylonConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the server address is not a socket address
    /// - the body limit is zero
    /// - the default media type is empty or unparsable
    /// - the log level is not a known level or filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.pipeline.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "pipeline.max_body_size",
                "must be greater than zero",
            ));
        }

        let media = self.pipeline.default_media_type.trim();
        if media.is_empty() || pylon_core::MediaType::parse(media).is_none() {
            return Err(ConfigError::invalid_value(
                "pipeline.default_media_type",
                format!("not a media type: '{media}'"),
            ));
        }

        let level = self.logging.level.trim();
        let known = LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str());
        if !known && pylon_telemetry::logging::create_env_filter(level).is_err() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("unknown log level: '{level}'"),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty `debug` logs and internal error messages
    /// in responses.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::PylonConfig;
    ///
    /// let config = PylonConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.pipeline.expose_internal_errors);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.pipeline.expose_internal_errors = true;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// Production preset: JSON `info` logs and generic 5xx messages.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::{LogFormat, PylonConfig};
    ///
    /// let config = PylonConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(!config.pipeline.expose_internal_errors);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.pipeline.expose_internal_errors = false;
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}

/// Builder for [`PylonConfig`].
#[derive(Debug, Default)]
pub struct PylonConfigBuilder {
    server: Option<ServerConfig>,
    pipeline: Option<PipelineConfig>,
    logging: Option<LoggingConfig>,
}

impl PylonConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> PylonConfig {
        PylonConfig {
            server: self.server.unwrap_or_default(),
            pipeline: self.pipeline.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PylonConfig::default().validate().is_ok());
        assert!(PylonConfig::development().validate().is_ok());
        assert!(PylonConfig::production().validate().is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let mut config = PylonConfig::default();
        config.server.http_addr = "localhost".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_zero_body_limit() {
        let mut config = PylonConfig::default();
        config.pipeline.max_body_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.max_body_size"));
    }

    #[test]
    fn test_empty_media_type() {
        let mut config = PylonConfig::default();
        config.pipeline.default_media_type = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.default_media_type"));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = PylonConfig::default();
        config.logging.level = "pylon=loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        config.logging.level = "pylon_pipeline=debug,info".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_defaults_missing_sections() {
        let config = PylonConfig::builder()
            .logging(LoggingConfig {
                level: "warn".to_string(),
                format: LogFormat::Pretty,
            })
            .build();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.server, ServerConfig::default());
    }
}
