//! HTTP routes for the Studio Controller.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers::{self, routing as routing_handlers};
use crate::models::OutputCatalog;
use crate::observability::{health_router, HealthState};
use crate::presence::{ConnectionRegistry, MembershipTable};
use crate::repositories::InMemoryStudioStore;
use crate::routing::RoutingMatrix;
use crate::signaling::{ParticipantJoined, SignalingBroker};
use crate::types::DestinationId;
use axum::{
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Presence and signaling.
    pub broker: Arc<SignalingBroker>,

    /// Audio/video routing.
    pub matrix: Arc<RoutingMatrix>,

    /// Liveness and readiness.
    pub health: Arc<HealthState>,

    /// Process-wide shutdown; connection tasks stop when it fires.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire presence, signaling and routing over one in-memory store.
    ///
    /// Returns the state plus the receiving end of participant-join events,
    /// which the caller hands to the auto-router task.
    pub fn from_store(
        config: Config,
        store: Arc<InMemoryStudioStore>,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<ParticipantJoined>) {
        let (join_tx, join_rx) = mpsc::unbounded_channel();

        let broker = SignalingBroker::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(MembershipTable::new()),
        )
        .with_join_events(join_tx);

        let outputs = OutputCatalog::new(
            DestinationId::from(config.default_audio_output.as_str()),
            DestinationId::from(config.default_video_output.as_str()),
        );
        let matrix = RoutingMatrix::new(store.clone(), store.clone(), store, outputs);

        let state = Self {
            config,
            broker: Arc::new(broker),
            matrix: Arc::new(matrix),
            health: Arc::new(HealthState::new()),
            shutdown,
        };
        (state, join_rx)
    }
}

/// Build the application routes.
///
/// - `/api/v1/...` routing API
/// - `/ws` signaling WebSocket
/// - `/health`, `/ready` probes and `/metrics`
/// - TraceLayer for request logging, 30 second timeout on the API
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/routes", post(routing_handlers::create_route))
        .route(
            "/api/v1/routes/:route_id",
            get(routing_handlers::get_route)
                .patch(routing_handlers::update_route)
                .delete(routing_handlers::delete_route),
        )
        .route(
            "/api/v1/routes/:route_id/toggle",
            post(routing_handlers::toggle_route),
        )
        .route(
            "/api/v1/routes/:route_id/volume",
            post(routing_handlers::set_route_volume),
        )
        .route(
            "/api/v1/routes/:route_id/destinations/:destination_id",
            post(routing_handlers::add_destination).delete(routing_handlers::remove_destination),
        )
        .route(
            "/api/v1/rooms/:room_id/routes",
            get(routing_handlers::list_routes),
        )
        .route(
            "/api/v1/rooms/:room_id/matrix",
            get(routing_handlers::routing_matrix),
        )
        .route(
            "/api/v1/rooms/:room_id/participants/:participant_id/auto-route",
            post(routing_handlers::auto_route_participant),
        )
        .route(
            "/api/v1/sources/audio/:source_id/levels",
            patch(routing_handlers::set_source_levels),
        )
        .with_state(Arc::clone(&state))
        // The WebSocket route must not carry the request timeout
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let ws_routes = Router::new()
        .route("/ws", get(handlers::ws_upgrade))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(ws_routes)
        .merge(metrics_routes)
        .merge(health_router(Arc::clone(&state.health)))
        .layer(TraceLayer::new_for_http())
}
