// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Request metrics
    pub requests_total: IntCounterVec,
    pub dispatch_duration_seconds: Histogram,

    // Per-check metrics
    pub check_results_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("heartbeat_requests_total", "Total number of heartbeat dispatches"),
            &["extended", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let dispatch_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "heartbeat_dispatch_duration_seconds",
            "Time to run a full check set",
        ))?;
        registry.register(Box::new(dispatch_duration_seconds.clone()))?;

        let check_results_total = IntCounterVec::new(
            Opts::new("heartbeat_check_results_total", "Check outcomes by name"),
            &["check", "status"],
        )?;
        registry.register(Box::new(check_results_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "heartbeat_check_duration_seconds",
                "Duration of a single check",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        Ok(Self {
            requests_total,
            dispatch_duration_seconds,
            check_results_total,
            check_duration_seconds,
        })
    }

    pub fn record_dispatch(&self, extended: bool, outcome: &str, duration: std::time::Duration) {
        let extended = if extended { "true" } else { "false" };
        self.requests_total
            .with_label_values(&[extended, outcome])
            .inc();

        self.dispatch_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_check(&self, check: &str, ok: bool, duration: std::time::Duration) {
        let status = if ok { "ok" } else { "failed" };
        self.check_results_total
            .with_label_values(&[check, status])
            .inc();

        self.check_duration_seconds
            .with_label_values(&[check])
            .observe(duration.as_secs_f64());
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
