//! Metrics collection for the relay bot using Prometheus
//!
//! Tracks relay outcomes, archive delivery failures, staging cleanup
//! warnings, Bot API retries and end-to-end relay duration.
//!
//! Metrics are registered by [`init_metrics`]. Until then every `record_*`
//! function is a no-op, so library code and tests never depend on global
//! registration order.

use once_cell::sync::OnceCell;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, TextEncoder};
use std::time::Duration;

struct RelayMetrics {
    /// Labels: outcome (delivered / rejected / source_unavailable / ...)
    relay_outcomes: IntCounterVec,
    archive_failures: IntCounter,
    cleanup_warnings: IntCounter,
    /// Labels: operation (get_me / set_webhook / ...)
    retry_attempts: IntCounterVec,
    relay_duration: Histogram,
}

static METRICS: OnceCell<RelayMetrics> = OnceCell::new();

/// Registers all metrics with the default Prometheus registry.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_metrics() -> prometheus::Result<()> {
    METRICS.get_or_try_init(|| {
        let relay_outcomes = IntCounterVec::new(
            Opts::new("vidrelay_relay_outcomes_total", "Finished relay requests by outcome"),
            &["outcome"],
        )?;
        let archive_failures = IntCounter::new(
            "vidrelay_archive_failures_total",
            "Archive deliveries that failed after the requester was served",
        )?;
        let cleanup_warnings = IntCounter::new(
            "vidrelay_cleanup_warnings_total",
            "Staged files that could not be removed",
        )?;
        let retry_attempts = IntCounterVec::new(
            Opts::new("vidrelay_retry_attempts_total", "Retried Bot API calls by operation"),
            &["operation"],
        )?;
        let relay_duration = Histogram::with_opts(
            HistogramOpts::new("vidrelay_relay_duration_seconds", "End-to-end relay duration")
                .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        )?;

        let registry = prometheus::default_registry();
        registry.register(Box::new(relay_outcomes.clone()))?;
        registry.register(Box::new(archive_failures.clone()))?;
        registry.register(Box::new(cleanup_warnings.clone()))?;
        registry.register(Box::new(retry_attempts.clone()))?;
        registry.register(Box::new(relay_duration.clone()))?;

        Ok::<_, prometheus::Error>(RelayMetrics {
            relay_outcomes,
            archive_failures,
            cleanup_warnings,
            retry_attempts,
            relay_duration,
        })
    })?;

    log::info!("Metrics registry initialized");
    Ok(())
}

pub fn record_relay_outcome(outcome: &str, elapsed: Duration) {
    if let Some(m) = METRICS.get() {
        m.relay_outcomes.with_label_values(&[outcome]).inc();
        m.relay_duration.observe(elapsed.as_secs_f64());
    }
}

pub fn record_archive_failure() {
    if let Some(m) = METRICS.get() {
        m.archive_failures.inc();
    }
}

pub fn record_cleanup_warning() {
    if let Some(m) = METRICS.get() {
        m.cleanup_warnings.inc();
    }
}

pub fn record_retry(operation: &str) {
    if let Some(m) = METRICS.get() {
        m.retry_attempts.with_label_values(&[operation]).inc();
    }
}

/// Renders the default registry in Prometheus text format.
pub fn render() -> Result<(String, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    let body = String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))?;
    Ok((encoder.format_type().to_string(), body))
}
