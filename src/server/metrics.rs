use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Tune Neutral metrics
const PREFIX: &str = "tune_neutral";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Ingestion Metrics
    pub static ref INGESTION_PAGES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_ingestion_pages_total"),
        "Saved-track pages fetched from the catalog"
    ).expect("Failed to create ingestion_pages_total metric");

    pub static ref TRACKS_INDEXED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_tracks_indexed_total"),
        "Tracks written to a user index"
    ).expect("Failed to create tracks_indexed_total metric");

    pub static ref TRACKS_SKIPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_tracks_skipped_total"), "Tracks skipped during ingestion"),
        &["reason"]
    ).expect("Failed to create tracks_skipped_total metric");

    pub static ref SCANS_SKIPPED_BY_LOCK_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_scans_skipped_by_lock_total"),
        "Ingestion calls short-circuited by the fetch lock"
    ).expect("Failed to create scans_skipped_by_lock_total metric");

    // Playlist Metrics
    pub static ref PLAYLISTS_GENERATED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_playlists_generated_total"),
        "Mood playlists generated"
    ).expect("Failed to create playlists_generated_total metric");

    pub static ref PLAYLIST_LENGTH: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_playlist_length"),
            "Number of tracks in generated playlists"
        )
        .buckets(vec![0.0, 1.0, 2.0, 4.0, 6.0, 8.0, 10.0])
    ).expect("Failed to create playlist_length metric");

    // Catalog Metrics
    pub static ref CATALOG_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_catalog_errors_total"), "Catalog call failures by kind"),
        &["kind"]
    ).expect("Failed to create catalog_errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(INGESTION_PAGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRACKS_INDEXED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRACKS_SKIPPED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SCANS_SKIPPED_BY_LOCK_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLISTS_GENERATED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_LENGTH.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_ingestion_page(indexed: usize) {
    INGESTION_PAGES_TOTAL.inc();
    TRACKS_INDEXED_TOTAL.inc_by(indexed as f64);
}

pub fn record_track_skipped(reason: &str) {
    TRACKS_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_scan_skipped_by_lock() {
    SCANS_SKIPPED_BY_LOCK_TOTAL.inc();
}

pub fn record_playlist_generated(length: usize) {
    PLAYLISTS_GENERATED_TOTAL.inc();
    PLAYLIST_LENGTH.observe(length as f64);
}

pub fn record_catalog_error(kind: &str) {
    CATALOG_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
