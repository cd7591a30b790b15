//! Metrics and observability utilities
//!
//! Provides counters and histograms with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CardForge metrics
pub const METRICS_PREFIX: &str = "cardforge";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_generation_jobs_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation jobs run"
    );

    describe_counter!(
        format!("{}_cards_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total cards created"
    );

    describe_counter!(
        format!("{}_chunks_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Chunks skipped because the model output failed validation"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end generation latency in seconds"
    );

    // Model backend metrics
    describe_counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total model backend requests"
    );

    describe_histogram!(
        format!("{}_model_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Model call latency in seconds"
    );

    // Dispatch / callback metrics
    describe_counter!(
        format!("{}_dispatches_total", METRICS_PREFIX),
        Unit::Count,
        "Jobs dispatched to the remote worker"
    );

    describe_counter!(
        format!("{}_callbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Worker callbacks received"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a completed generation run
pub fn record_generation(duration_secs: f64, cards_created: u64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_jobs_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_cards_created_total", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .increment(cards_created);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Record a skipped chunk (validation or malformed output)
pub fn record_chunk_skipped(reason: &str) {
    counter!(
        format!("{}_chunks_skipped_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a model backend call
pub fn record_model_call(duration_secs: f64, backend: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_model_duration_seconds", METRICS_PREFIX),
            "backend" => backend.to_string()
        )
        .record(duration_secs);
    }
}

/// Record a dispatch attempt
pub fn record_dispatch(success: bool) {
    let status = if success { "accepted" } else { "failed" };
    counter!(
        format!("{}_dispatches_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record an inbound worker callback
pub fn record_callback(outcome: &str) {
    counter!(
        format!("{}_callbacks_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/v1/uploads/generate");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }

    #[test]
    fn test_recorders_do_not_panic() {
        record_generation(1.5, 12, "local", true);
        record_chunk_skipped("validation");
        record_model_call(0.8, "local", true);
        record_dispatch(true);
        record_callback("done");
    }
}
