//! Pipeline metrics.
//!
//! Recording goes through the `metrics` facade. [`install_prometheus`]
//! installs a Prometheus recorder whose handle renders the text exposition
//! format; the transport decides whether and where to serve it.
//!
//! ```rust,ignore
//! use pylon_telemetry::metrics::{install_prometheus, record_request};
//! use std::time::Duration;
//!
//! let registry = install_prometheus()?;
//! record_request(200, "send", Duration::from_millis(4));
//! assert!(registry.render().contains("pylon_requests_total"));
//! ```

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Completed executions by final status and the phase that produced them.
pub const REQUESTS_TOTAL: &str = "pylon_requests_total";
/// Execution latency in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "pylon_request_duration_seconds";
/// Filter aborts by phase.
pub const ABORTS_TOTAL: &str = "pylon_aborts_total";
/// Resolved failures by error type and whether a mapper handled them.
pub const EXCEPTIONS_TOTAL: &str = "pylon_exceptions_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Renders installed metrics.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Wraps a Prometheus handle.
    #[must_use]
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs a global Prometheus recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if a recorder is already
/// installed.
pub fn install_prometheus() -> TelemetryResult<MetricsRegistry> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle.clone());
    describe_metrics();

    Ok(MetricsRegistry::new(handle))
}

/// Renders metrics if a recorder was installed through this crate.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Pipeline executions by status and final phase");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Pipeline execution time in seconds");
    describe_counter!(ABORTS_TOTAL, "Requests aborted by a filter");
    describe_counter!(EXCEPTIONS_TOTAL, "Failures resolved to a response");
}

/// Records a completed execution.
pub fn record_request(status: u16, phase: &'static str, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "status" => status.to_string(),
        "phase" => phase
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "status" => status.to_string())
        .record(duration.as_secs_f64());
}

/// Records a filter abort.
pub fn record_abort(phase: &'static str) {
    counter!(ABORTS_TOTAL, "phase" => phase).increment(1);
}

/// Records a resolved failure.
pub fn record_exception(error_type: &'static str, mapped: bool) {
    counter!(
        EXCEPTIONS_TOTAL,
        "error_type" => error_type,
        "mapped" => if mapped { "true" } else { "false" }
    )
    .increment(1);
}
