//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, LogFormat, PylonConfig};

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "PYLON";

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. `.env` file, if requested
/// 4. Environment variables named `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use pylon_config::ConfigLoader;
///
/// # fn main() -> Result<(), pylon_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("pylon.toml")?
///     .with_dotenv()?
///     .with_env_prefix("PYLON")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: PylonConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PylonConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = PylonConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = PylonConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = PylonConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`. Sections
    /// absent from the file fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The extension is not supported
    /// - The content is invalid or has unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_failed(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.config = parse(&content, format)?;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [pipeline]
    ///     max_body_size = 4096
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.pipeline.max_body_size, 4096);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Load variables from `.env` in the working directory, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// With prefix `PYLON`:
    /// - `PYLON__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `PYLON__PIPELINE__MAX_BODY_SIZE=1048576`
    /// - `PYLON__LOGGING__LEVEL=debug`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation
    /// fails.
    pub fn load(mut self) -> Result<PylonConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> PylonConfig {
        self.config
    }

    fn apply_env_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(path) = key.strip_prefix(&marker) {
                self.apply_env_var(&key, path, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();

        match parts.as_slice() {
            // Server section
            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "MAX_CONNECTIONS"] => {
                self.config.server.max_connections = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_SECS"] => {
                self.config.server.request_timeout_secs = parse_number(key, value)?;
            }

            // Pipeline section
            ["PIPELINE", "EXPOSE_INTERNAL_ERRORS"] => {
                self.config.pipeline.expose_internal_errors = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_env_var(key, "expected boolean"))?;
            }
            ["PIPELINE", "DEFAULT_MEDIA_TYPE"] => {
                self.config.pipeline.default_media_type = value.to_string();
            }
            ["PIPELINE", "MAX_BODY_SIZE"] => {
                self.config.pipeline.max_body_size = parse_number(key, value)?;
            }

            // Logging section
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::bad_env_var(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            // Unknown keys under the prefix are ignored
            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<PylonConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::bad_env_var(key, "expected integer"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
