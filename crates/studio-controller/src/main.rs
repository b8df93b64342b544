//! Studio Controller
//!
//! Entry point for the studio presence/signaling broker and routing matrix.
//! Serves the signaling WebSocket, the routing API, health probes and
//! Prometheus metrics from one listener.

use std::net::SocketAddr;
use std::sync::Arc;
use studio_controller::config::Config;
use studio_controller::observability::metrics::init_metrics_recorder;
use studio_controller::repositories::InMemoryStudioStore;
use studio_controller::routes::{self, AppState};
use studio_controller::tasks::{start_auto_router, RoomReaperConfig, RoomReaperHandle};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studio_controller=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio Controller");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        instance_id = %config.instance_id,
        bind_address = %config.bind_address,
        room_ttl_seconds = config.room_ttl_seconds,
        reaper_interval_seconds = config.reaper_interval_seconds,
        outbound_buffer = config.outbound_buffer,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let shutdown = CancellationToken::new();

    // Sources and participants are owned by external services; standalone
    // deployments start with an empty in-memory store.
    let store = Arc::new(InMemoryStudioStore::new());
    let reaper_config = RoomReaperConfig::from(&config);
    let (state, join_events) = AppState::from_store(config, store, shutdown.clone());
    let state = Arc::new(state);

    let reaper = RoomReaperHandle::spawn(
        Arc::clone(state.broker.membership()),
        reaper_config,
        &shutdown,
    );
    let auto_router = tokio::spawn(start_auto_router(
        Arc::clone(&state.matrix),
        join_events,
        shutdown.child_token(),
    ));

    let app = routes::build_routes(Arc::clone(&state), metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {}: {}", addr, e);
        e
    })?;

    state.health.set_ready();
    info!("Studio Controller listening on {}", addr);

    let server_shutdown = shutdown.clone();
    let health = Arc::clone(&state.health);
    tokio::spawn(async move {
        shutdown_signal().await;
        health.set_not_ready();
        server_shutdown.cancel();
    });

    let serve_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_token.cancelled().await })
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            e
        })?;

    // Stop background tasks
    shutdown.cancel();
    reaper.stop().await;
    if let Err(e) = auto_router.await {
        error!("Auto-router task failed: {}", e);
    }

    info!("Studio Controller shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
