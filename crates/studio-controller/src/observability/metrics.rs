//! Metrics definitions for the Studio Controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `studio_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `event`: 3 values (offer, answer, ice-candidate)
//! - `reason`: bounded by `DropReason` variants
//! - `medium`: 2 values (audio, video)
//!
//! Room, connection and route ids are never used as labels.

use crate::signaling::forwarder::DropReason;
use crate::signaling::protocol::SignalEvent;
use crate::types::Medium;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its handle.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Reap passes walk in-memory maps; anything near a second is a problem
        .set_buckets_for_metric(
            Matcher::Full("studio_room_reap_duration_seconds".to_string()),
            &[
                0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set reap duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Presence Gauges
// ============================================================================

/// Metric: `studio_connections_active`
pub fn set_connections_active(count: usize) {
    gauge!("studio_connections_active").set(count as f64);
}

/// Metric: `studio_rooms_active`
///
/// Counts room entries, including empty rooms waiting to be reaped.
pub fn set_rooms_active(count: usize) {
    gauge!("studio_rooms_active").set(count as f64);
}

// ============================================================================
// Signaling
// ============================================================================

/// Metric: `studio_signals_forwarded_total`, `studio_signal_recipients_total`
/// Labels: `event`
pub fn record_signal_forwarded(event: SignalEvent, recipients: usize) {
    counter!("studio_signals_forwarded_total", "event" => event.wire_name()).increment(1);
    counter!("studio_signal_recipients_total", "event" => event.wire_name())
        .increment(recipients as u64);
}

/// Metric: `studio_signals_dropped_total`
/// Labels: `event`, `reason`
pub fn record_signal_dropped(event: SignalEvent, reason: DropReason) {
    counter!("studio_signals_dropped_total",
        "event" => event.wire_name(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Metric: `studio_client_frames_rejected_total`
///
/// Frames that could not be parsed. The connection stays open.
pub fn record_frame_rejected() {
    counter!("studio_client_frames_rejected_total").increment(1);
}

// ============================================================================
// Room Reaper
// ============================================================================

/// Metric: `studio_rooms_reaped_total`, `studio_room_reap_duration_seconds`
pub fn record_reap_pass(reaped: usize, duration: Duration) {
    counter!("studio_rooms_reaped_total").increment(reaped as u64);
    histogram!("studio_room_reap_duration_seconds").record(duration.as_secs_f64());
}

// ============================================================================
// Routing
// ============================================================================

/// Metric: `studio_routes_created_total`
/// Labels: `medium`, `origin` (manual, auto)
pub fn record_route_created(medium: Medium, origin: &'static str) {
    counter!("studio_routes_created_total",
        "medium" => medium.as_str(),
        "origin" => origin
    )
    .increment(1);
}
