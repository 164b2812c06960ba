use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sessions_total",
        "Total number of assessment sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of currently active sessions"
    )
    .unwrap();

    pub static ref EXECUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "executions_total",
        "Total number of execution service calls",
        &["status"]
    )
    .unwrap();

    pub static ref TEST_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "test_runs_total",
        "Total number of full test-harness runs",
        &["passed"]
    )
    .unwrap();

    pub static ref HINTS_SERVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hints_served_total",
        "Total number of unlocked hints served",
        &["kind"]
    )
    .unwrap();

    pub static ref ASSIST_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assist_requests_total",
        "Total number of AI assist requests",
        &["status"]
    )
    .unwrap();

    pub static ref FINALIZE_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "finalize_calls_total",
        "Total number of finalize calls to the grading service",
        &["status"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
