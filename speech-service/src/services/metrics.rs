//! Metrics collection and Prometheus export.
//!
//! Installs the Prometheus recorder and records provider and analysis metrics
//! through the `metrics` facade.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Calling this more than once is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    // A concurrent caller may have won the race; its handle is equivalent.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one provider call.
pub fn record_provider_call(provider: &'static str, model: &str, elapsed: Duration) {
    metrics::histogram!(
        "speech_provider_latency_seconds",
        "provider" => provider,
        "model" => model.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_provider_error(provider: &'static str, kind: &'static str) {
    metrics::counter!(
        "speech_provider_errors_total",
        "provider" => provider,
        "kind" => kind
    )
    .increment(1);
}

pub fn record_tokens(provider: &'static str, input_tokens: i32, output_tokens: i32) {
    metrics::counter!("speech_tokens_total", "provider" => provider, "direction" => "input")
        .increment(input_tokens.max(0) as u64);
    metrics::counter!("speech_tokens_total", "provider" => provider, "direction" => "output")
        .increment(output_tokens.max(0) as u64);
}

/// Record the outcome of an analysis request, e.g. "ok", "invalid_output".
pub fn record_analysis(provider: &'static str, input: &'static str, outcome: &'static str) {
    metrics::counter!(
        "speech_analyses_total",
        "provider" => provider,
        "input" => input,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_validation_warnings(provider: &'static str, count: usize) {
    if count > 0 {
        metrics::counter!("speech_validation_warnings_total", "provider" => provider)
            .increment(count as u64);
    }
}
