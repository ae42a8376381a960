//! Logging and metrics for Pylon.
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter` and either JSON
//!   or pretty output, see [`init_logging`].
//! - **Metrics**: recorded through the `metrics` facade, optionally exported
//!   in Prometheus text format, see [`install_prometheus`].
//!
//! Recording never requires an installed recorder. Without one the
//! `metrics` macros are no-ops, so pipelines run the same in tests.
//!
//! # Pipeline Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `pylon_requests_total` | Counter | `status`, `phase` | Completed executions |
//! | `pylon_request_duration_seconds` | Histogram | `status` | Execution latency |
//! | `pylon_aborts_total` | Counter | `phase` | Filter aborts |
//! | `pylon_exceptions_total` | Counter | `error_type`, `mapped` | Resolved failures |
//!
//! # Example
//!
//! ```rust,ignore
//! use pylon_telemetry::{init_logging, install_prometheus, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! let metrics = install_prometheus()?;
//!
//! // ... serve traffic ...
//! println!("{}", metrics.render());
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{fields, init_logging, LogConfig, LogFormat};
pub use metrics::{install_prometheus, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
