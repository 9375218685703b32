use gradbot_core::SyncError;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

static METRICS: OnceLock<Metrics> = OnceLock::new();

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub sync_operations_total: IntCounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let sync_operations_total = IntCounterVec::new(
            Opts::new(
                "sync_operations_total",
                "Synchronizer operations against the chat backend",
            ),
            &["operation", "outcome"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(sync_operations_total.clone()))
            .expect("collector can be registered");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            sync_operations_total,
        }
    }
}

pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Register collectors up front so /metrics lists them before first use.
pub fn init_metrics() {
    metrics();
}

/// Count one synchronizer call by outcome: `ok`, or the failure kind.
pub fn record_operation<T>(operation: &str, result: &Result<T, SyncError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(SyncError::Transport(_)) => "transport_error",
        Err(SyncError::Status { .. }) => "status_error",
        Err(SyncError::Decode(_)) => "decode_error",
        Err(SyncError::NoDocuments) => "no_documents",
        Err(SyncError::InvalidEndpoint(_)) => "invalid_endpoint",
    };
    metrics()
        .sync_operations_total
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = metrics().registry.gather();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
