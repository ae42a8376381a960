//! Wiring configuration, logging, pipeline and server together.

use pylon_config::{ConfigError, PipelineConfig, PylonConfig};
use pylon_core::MediaType;
use pylon_pipeline::{Pipeline, PipelineOptions, Registry};
use pylon_server::{Server, ServerConfig, ServerError, ShutdownSignal};
use pylon_telemetry::TelemetryError;
use thiserror::Error;
use tracing::info;

/// Errors raised while starting or running an [`App`].
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The transport failed.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The registry was rejected.
    #[error(transparent)]
    Registry(#[from] pylon_pipeline::RegistryError),
}

/// Converts the pipeline section into executor options.
pub fn pipeline_options(config: &PipelineConfig) -> Result<PipelineOptions, ConfigError> {
    let media_type = MediaType::parse(config.default_media_type.trim()).ok_or_else(|| {
        ConfigError::invalid_value(
            "pipeline.default_media_type",
            format!("not a media type: '{}'", config.default_media_type),
        )
    })?;
    Ok(PipelineOptions::new()
        .expose_internal_errors(config.expose_internal_errors)
        .default_media_type(media_type))
}

/// Converts the server and pipeline sections into transport settings.
#[must_use]
pub fn server_config(config: &PylonConfig) -> ServerConfig {
    let max_connections = usize::try_from(config.server.max_connections)
        .ok()
        .filter(|max| *max > 0);
    ServerConfig::builder()
        .http_addr(config.server.http_addr.clone())
        .shutdown_timeout(std::time::Duration::from_secs(
            config.server.shutdown_timeout_secs,
        ))
        .request_timeout(std::time::Duration::from_secs(
            config.server.request_timeout_secs,
        ))
        .max_connections(max_connections)
        .max_body_size(config.pipeline.max_body_size)
        .build()
}

/// A registry plus the configuration it runs under.
#[derive(Debug)]
pub struct App {
    registry: Registry,
    config: PylonConfig,
}

impl App {
    /// Creates an app.
    #[must_use]
    pub fn new(registry: Registry, config: PylonConfig) -> Self {
        Self { registry, config }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &PylonConfig {
        &self.config
    }

    /// Builds the pipeline without any transport.
    pub fn into_pipeline(self) -> Result<Pipeline, AppError> {
        let options = pipeline_options(&self.config.pipeline)?;
        Ok(Pipeline::with_options(self.registry, options))
    }

    /// Builds the HTTP server.
    pub fn into_server(self) -> Result<Server, AppError> {
        let transport = server_config(&self.config);
        let pipeline = self.into_pipeline()?;
        Ok(Server::new(pipeline, transport))
    }

    /// Installs logging and serves until SIGTERM or Ctrl+C.
    pub async fn run(self) -> Result<(), AppError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Installs logging and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), AppError> {
        self.config.validate()?;
        pylon_telemetry::init_logging(&self.config.logging.to_log_config())?;
        info!(
            operations = self.registry.operations().len(),
            addr = %self.config.server.http_addr,
            "starting pylon"
        );
        self.into_server()?.run_with_shutdown(shutdown).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pipeline_options_from_config() {
        let config = PipelineConfig {
            expose_internal_errors: true,
            default_media_type: "text/plain".into(),
            ..Default::default()
        };
        let options = pipeline_options(&config).unwrap();
        assert!(options.exposes_internal_errors());
        assert_eq!(options.fallback_media_type().essence(), "text/plain");
    }

    #[test]
    fn test_bad_media_type_rejected() {
        let config = PipelineConfig {
            default_media_type: "nonsense".into(),
            ..Default::default()
        };
        assert!(pipeline_options(&config).is_err());
    }

    #[test]
    fn test_server_config_from_config() {
        let mut config = PylonConfig::default();
        config.server.http_addr = "127.0.0.1:9999".into();
        config.server.request_timeout_secs = 3;
        config.pipeline.max_body_size = 512;

        let transport = server_config(&config);
        assert_eq!(transport.http_addr(), "127.0.0.1:9999");
        assert_eq!(transport.request_timeout(), Duration::from_secs(3));
        assert_eq!(transport.max_body_size(), 512);
        assert_eq!(transport.max_connections(), Some(10000));
    }
}
