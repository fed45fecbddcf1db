//! Telemetry sinks injected into a module.

/// Receives read-only numeric samples for dashboards.
///
/// Samples are informational; a sink must never fail the control cycle.
pub trait TelemetrySink: Send + Sync {
    /// Record `value` on `channel`.
    fn record(&self, channel: &str, value: f64);
}

/// Sink that drops every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&self, _channel: &str, _value: f64) {}
}
