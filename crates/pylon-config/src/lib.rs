//! Typed configuration for Pylon.
//!
//! - TOML and JSON configuration files
//! - `.env` files via `dotenvy`
//! - Environment variable overrides
//! - Strict parsing (unknown fields fail)
//! - Layered loading (defaults → file → `.env` → env)
//!
//! # Example
//!
//! ```no_run
//! use pylon_config::{ConfigLoader, PylonConfig};
//!
//! # fn main() -> Result<(), pylon_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("pylon.toml")?
//!     .with_env_prefix("PYLON")
//!     .load()?;
//!
//! println!("Listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_connections = 10000
//! request_timeout_secs = 30
//!
//! [pipeline]
//! expose_internal_errors = false
//! default_media_type = "application/json"
//! max_body_size = 2097152
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Keys use the form `PREFIX__SECTION__KEY`, for example
//! `PYLON__SERVER__HTTP_ADDR=0.0.0.0:9000` or `PYLON__LOGGING__LEVEL=debug`.

#![doc(html_root_url = "https://docs.rs/pylon-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{PylonConfig, PylonConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{LogFormat, LoggingConfig, PipelineConfig, ServerConfig};
