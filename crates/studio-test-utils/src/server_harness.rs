//! Test server harness for E2E testing
//!
//! Provides `TestStudioServer` for spawning real Studio Controller instances
//! in tests.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use studio_controller::config::Config;
use studio_controller::repositories::InMemoryStudioStore;
use studio_controller::routes::{self, AppState};
use studio_controller::signaling::ParticipantJoined;
use studio_controller::tasks::start_auto_router;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the Studio Controller in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<(), anyhow::Error> {
///     let server = TestStudioServer::spawn(Arc::new(InMemoryStudioStore::new())).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestStudioServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestStudioServer {
    /// Spawn a server over `store` with the auto-router running.
    ///
    /// Binds to a random available port (127.0.0.1:0).
    pub async fn spawn(store: Arc<InMemoryStudioStore>) -> Result<Self, anyhow::Error> {
        let config = test_config()?;
        let (state, join_events) = AppState::from_store(config, store, CancellationToken::new());
        Self::spawn_with_state(state, Some(join_events)).await
    }

    /// Spawn a server over hand-built state, e.g. a matrix backed by
    /// a failing store. Join events are routed only if a receiver is given.
    pub async fn spawn_with_state(
        state: AppState,
        join_events: Option<mpsc::UnboundedReceiver<ParticipantJoined>>,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(state);
        let shutdown = state.shutdown.clone();

        if let Some(events) = join_events {
            tokio::spawn(start_auto_router(
                Arc::clone(&state.matrix),
                events,
                shutdown.child_token(),
            ));
        }

        // Local recorder only; tests must not install a global one
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        state.health.set_ready();

        let serve_token = shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { serve_token.cancelled().await })
                .await
            {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            shutdown,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the signaling WebSocket URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state, for inspecting presence directly.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestStudioServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self._handle.abort();
    }
}

/// Configuration used by the harness.
pub fn test_config() -> Result<Config, anyhow::Error> {
    let vars = HashMap::from([
        ("STUDIO_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("STUDIO_INSTANCE_ID".to_string(), "studio-test".to_string()),
        ("STUDIO_OUTBOUND_BUFFER".to_string(), "16".to_string()),
    ]);
    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestStudioServer::spawn(Arc::new(InMemoryStudioStore::new())).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.ws_url().ends_with("/ws"));
        assert!(server.addr().ip().is_loopback());
        assert!(server.state().health.is_ready());

        Ok(())
    }
}
