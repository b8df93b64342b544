//! Auto-router background task.
//!
//! Consumes participant-joined events from the signaling broker and creates
//! the participant's routes. Failures are logged; the join itself has
//! already succeeded and is never rolled back.

use crate::routing::RoutingMatrix;
use crate::signaling::ParticipantJoined;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Run until the event channel closes or `cancel_token` is cancelled.
#[instrument(skip_all, name = "studio.task.auto_router")]
pub async fn start_auto_router(
    matrix: Arc<RoutingMatrix>,
    mut events: mpsc::UnboundedReceiver<ParticipantJoined>,
    cancel_token: CancellationToken,
) {
    info!(target: "studio.task.auto_router", "Starting auto-router task");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!(target: "studio.task.auto_router", "Event channel closed");
                    break;
                };
                handle_join(&matrix, &event).await;
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "studio.task.auto_router",
                    "Auto-router received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "studio.task.auto_router", "Auto-router task stopped");
}

async fn handle_join(matrix: &RoutingMatrix, event: &ParticipantJoined) {
    match matrix
        .auto_route_participant(&event.room_id, &event.participant_id)
        .await
    {
        Ok(routes) => {
            debug!(
                target: "studio.task.auto_router",
                room_id = %event.room_id,
                participant_id = %event.participant_id,
                routes_created = routes.len(),
                "Participant auto-routed"
            );
        }
        Err(e) => {
            warn!(
                target: "studio.task.auto_router",
                room_id = %event.room_id,
                participant_id = %event.participant_id,
                error = %e,
                "Auto-routing failed"
            );
        }
    }
}
