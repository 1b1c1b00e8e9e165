//! Prometheus metrics registration and export.
//!
//! This module defines the Prometheus metrics exposed by the sample service
//! and provides functions for initializing, recording, and exporting them.

use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::{Mutex, OnceLock};

/// Global Prometheus registry for all route_forge metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total `/generate` requests, labeled by outcome (`ok`, `failed`, `invalid`).
pub static GENERATE_REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Cache lookups, labeled by result (`hit`, `miss`).
pub static CACHE_LOOKUPS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Wall-clock time spent synthesizing, solving and rendering one request.
pub static SOLVE_DURATION: OnceLock<Histogram> = OnceLock::new();

/// Serializes [`init_metrics`] so every metric lands in the same registry.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialize all metrics and register them with the registry.
///
/// Safe to call more than once; later calls leave the first registration in
/// place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric construction or registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let generate_requests_total = CounterVec::new(
        Opts::new(
            "route_forge_generate_requests_total",
            "Total /generate requests by outcome",
        ),
        &["outcome"],
    )?;

    let cache_lookups_total = CounterVec::new(
        Opts::new(
            "route_forge_cache_lookups_total",
            "Sample cache lookups by result",
        ),
        &["result"],
    )?;

    let solve_duration = Histogram::with_opts(
        HistogramOpts::new(
            "route_forge_solve_duration_seconds",
            "Time spent solving and rendering one uncached request",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )?;

    registry.register(Box::new(generate_requests_total.clone()))?;
    registry.register(Box::new(cache_lookups_total.clone()))?;
    registry.register(Box::new(solve_duration.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = GENERATE_REQUESTS_TOTAL.set(generate_requests_total);
    let _ = CACHE_LOOKUPS_TOTAL.set(cache_lookups_total);
    let _ = SOLVE_DURATION.set(solve_duration);

    tracing::info!("Prometheus metrics initialized successfully");

    Ok(())
}

/// Count one `/generate` request. No-op before [`init_metrics`].
pub fn record_generate(outcome: &str) {
    if let Some(counter) = GENERATE_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Count one cache lookup. No-op before [`init_metrics`].
pub fn record_cache_lookup(hit: bool) {
    if let Some(counter) = CACHE_LOOKUPS_TOTAL.get() {
        counter
            .with_label_values(&[if hit { "hit" } else { "miss" }])
            .inc();
    }
}

/// Record the duration of one uncached solve. No-op before [`init_metrics`].
pub fn observe_solve_duration(seconds: f64) {
    if let Some(histogram) = SOLVE_DURATION.get() {
        histogram.observe(seconds);
    }
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns a comment line instead of failing when the registry is not
/// initialized or encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

/// HTTP handler for the /metrics endpoint.
pub async fn metrics_handler() -> String {
    export_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(REGISTRY.get().is_some());
    }

    #[test]
    fn test_recorded_values_are_exported() {
        init_metrics().unwrap();
        record_generate("ok");
        record_cache_lookup(true);
        record_cache_lookup(false);
        observe_solve_duration(0.3);

        let text = export_metrics();
        assert!(text.contains("route_forge_generate_requests_total"));
        assert!(text.contains(r#"outcome="ok""#));
        assert!(text.contains(r#"result="hit""#));
        assert!(text.contains("route_forge_solve_duration_seconds_bucket"));
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_text() {
        init_metrics().unwrap();
        let body = metrics_handler().await;
        assert!(!body.is_empty());
    }
}
