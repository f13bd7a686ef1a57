//! Prometheus metrics for tracker observability.

use metrics::counter;

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a defect creation.
pub fn defect_created() {
    counter!("tracker_defects_created_total").increment(1);
}

/// Record an accepted defect status transition.
pub fn defect_status_changed(status: &str) {
    counter!("tracker_defect_status_total", "status" => status.to_string()).increment(1);
}

/// Record an audit ledger append.
pub fn history_recorded(action: &str) {
    counter!("tracker_history_entries_total", "action" => action.to_string()).increment(1);
}

/// Record a denied access check.
pub fn access_denied(operation: &str) {
    counter!("tracker_access_denied_total", "operation" => operation.to_string()).increment(1);
}

/// Record a comment append.
pub fn comment_added() {
    counter!("tracker_comments_total").increment(1);
}
