// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed Prometheus metrics catalogue (spec §4.8).

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Histogram buckets shared by every duration metric (spec §4.8).
const DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Owns the Prometheus [`Registry`] and every metric named in spec §4.8.
/// Safe for concurrent counter/histogram updates (spec §5).
pub struct Metrics {
    registry: Registry,
    pub exports_total: IntCounterVec,
    pub export_duration_seconds: HistogramVec,
    pub api_calls_total: IntCounterVec,
    pub api_call_duration_seconds: HistogramVec,
    pub cache_hit_rate: prometheus::GaugeVec,
    pub health_status: prometheus::GaugeVec,
    pub component_health: prometheus::GaugeVec,
    pub goroutines_count: prometheus::Gauge,
    pub memory_usage_bytes: prometheus::GaugeVec,
    pub start_time_seconds: prometheus::Gauge,
}

impl Metrics {
    // Metric names/labels below are fixed string literals (spec §4.8); a
    // bad `Opts` or a duplicate registration is a programming error caught
    // immediately by any test that constructs a `Metrics`, not a runtime
    // condition callers need to handle.
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    pub fn new() -> Self {
        let registry = Registry::new();

        let exports_total = IntCounterVec::new(
            Opts::new("exports_total", "Total number of export operations"),
            &["status", "type", "format"],
        )
        .expect("valid metric opts");

        let export_duration_seconds = HistogramVec::new(
            HistogramOpts::new("export_duration_seconds", "Export operation duration")
                .buckets(DURATION_BUCKETS.to_vec()),
            &["type", "status"],
        )
        .expect("valid metric opts");

        let api_calls_total = IntCounterVec::new(
            Opts::new("api_calls_total", "Total upstream API calls"),
            &["service", "endpoint", "method", "status_code"],
        )
        .expect("valid metric opts");

        let api_call_duration_seconds = HistogramVec::new(
            HistogramOpts::new("api_call_duration_seconds", "Upstream API call duration")
                .buckets(DURATION_BUCKETS.to_vec()),
            &["service", "endpoint", "method"],
        )
        .expect("valid metric opts");

        let cache_hit_rate = prometheus::GaugeVec::new(
            Opts::new("cache_hit_rate", "Cache hit rate"),
            &["type"],
        )
        .expect("valid metric opts");

        let health_status = prometheus::GaugeVec::new(
            Opts::new("health_status", "Aggregate health status (1=healthy)"),
            &["version"],
        )
        .expect("valid metric opts");

        let component_health = prometheus::GaugeVec::new(
            Opts::new("component_health", "Per-component health (1/0.5/0)"),
            &["component", "version"],
        )
        .expect("valid metric opts");

        let goroutines_count =
            prometheus::Gauge::new("goroutines_count", "Number of concurrent tasks in flight")
                .expect("valid metric opts");

        let memory_usage_bytes = prometheus::GaugeVec::new(
            Opts::new("memory_usage_bytes", "Process memory usage"),
            &["type"],
        )
        .expect("valid metric opts");

        let start_time_seconds =
            prometheus::Gauge::new("start_time_seconds", "Unix timestamp the process started")
                .expect("valid metric opts");

        for collector in [
            Box::new(exports_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(export_duration_seconds.clone()),
            Box::new(api_calls_total.clone()),
            Box::new(api_call_duration_seconds.clone()),
            Box::new(cache_hit_rate.clone()),
            Box::new(health_status.clone()),
            Box::new(component_health.clone()),
            Box::new(goroutines_count.clone()),
            Box::new(memory_usage_bytes.clone()),
            Box::new(start_time_seconds.clone()),
        ] {
            registry.register(collector).expect("unique metric name");
        }

        Self {
            registry,
            exports_total,
            export_duration_seconds,
            api_calls_total,
            api_call_duration_seconds,
            cache_hit_rate,
            health_status,
            component_health,
            goroutines_count,
            memory_usage_bytes,
            start_time_seconds,
        }
    }

    pub fn record_export(&self, status: &str, kind: &str, format: &str, duration: Duration) {
        self.exports_total.with_label_values(&[status, kind, format]).inc();
        self.export_duration_seconds
            .with_label_values(&[kind, status])
            .observe(duration.as_secs_f64());
    }

    pub fn record_api_call(
        &self,
        service: &str,
        endpoint: &str,
        method: &str,
        status_code: &str,
        duration: Duration,
    ) {
        self.api_calls_total.with_label_values(&[service, endpoint, method, status_code]).inc();
        self.api_call_duration_seconds
            .with_label_values(&[service, endpoint, method])
            .observe(duration.as_secs_f64());
    }

    /// Render the full registry in Prometheus text-exposition format
    /// (spec §6 `GET /metrics`).
    #[allow(clippy::expect_used)]
    pub fn render(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer).expect("text encoding never fails");
        String::from_utf8(buffer).expect("prometheus text output is always utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
