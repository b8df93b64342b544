//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it. Only operational data with
//! bounded label cardinality is exposed; no room or connection ids.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
#[tracing::instrument(skip_all, name = "studio.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
