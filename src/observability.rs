use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: detection passes run. Labels: none.
pub const DETECTIONS_TOTAL: &str = "rostra_detections_total";

/// Histogram: detection pass duration in seconds.
pub const DETECTION_DURATION_SECONDS: &str = "rostra_detection_duration_seconds";

/// Counter: conflicts produced by detection. Labels: kind, severity.
pub const CONFLICTS_DETECTED_TOTAL: &str = "rostra_conflicts_detected_total";

/// Counter: resolution requests executed. Labels: kind, mode.
pub const RESOLUTIONS_TOTAL: &str = "rostra_resolutions_total";

/// Counter: resolution requests that failed. Labels: kind.
pub const RESOLUTION_FAILURES_TOTAL: &str = "rostra_resolution_failures_total";

/// Counter: per-item outcomes inside batch resolution. Labels: status.
pub const BATCH_ITEMS_TOTAL: &str = "rostra_batch_items_total";

/// Counter: rules/constraints that failed to evaluate during detection.
pub const DETECTION_DIAGNOSTICS_TOTAL: &str = "rostra_detection_diagnostics_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus exporter");
}
