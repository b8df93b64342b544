//! Per-connection WebSocket task.
//!
//! Each upgraded socket is split into:
//! - a writer task that owns the sink and drains the connection's outbound
//!   queue (relayed signals, acks) plus periodic pings
//! - the reader loop, which parses client frames and dispatches them to the
//!   broker
//!
//! # Lifecycle
//!
//! 1. `connect` registers the connection and the client receives `connected`
//! 2. Runs until the client closes, the socket errors, or shutdown is signaled
//! 3. `disconnect` removes membership and the registry entry before returning

use crate::observability::metrics;
use crate::signaling::broker::SignalingBroker;
use crate::signaling::protocol::{ClientFrame, ServerEvent, SignalEvent, SignalFrame};
use crate::types::ConnectionId;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Server sends a WebSocket ping this often.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Drive one WebSocket until it closes or `shutdown` fires.
#[instrument(skip_all, name = "studio.ws.connection")]
pub async fn run_connection(
    socket: WebSocket,
    broker: Arc<SignalingBroker>,
    outbound_buffer: usize,
    shutdown: CancellationToken,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<ServerEvent>(outbound_buffer);

    let connection_id = match broker.connect(tx.clone()) {
        Ok(id) => id,
        Err(e) => {
            warn!(target: "studio.ws", error = %e, "Failed to register connection");
            return;
        }
    };

    // The greeting goes through the same queue as everything else so ordering
    // with later events is preserved.
    if tx.try_send(ServerEvent::connected(&connection_id)).is_err() {
        warn!(target: "studio.ws", connection_id = %connection_id, "Failed to queue greeting");
    }
    drop(tx);

    let writer_token = shutdown.child_token();
    let writer = tokio::spawn(writer_task(
        ws_sender,
        rx,
        connection_id.clone(),
        writer_token.clone(),
    ));

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!(target: "studio.ws", connection_id = %connection_id, "Shutdown, closing connection");
                break;
            }
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&broker, &connection_id, &text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(target: "studio.ws", connection_id = %connection_id, "Client closed connection");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        metrics::record_frame_rejected();
                        debug!(target: "studio.ws", connection_id = %connection_id, "Binary frame ignored");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Err(e)) => {
                        debug!(target: "studio.ws", connection_id = %connection_id, error = %e, "WebSocket read error");
                        break;
                    }
                }
            }
        }
    }

    broker.disconnect(&connection_id);
    writer_token.cancel();
    if let Err(e) = writer.await {
        warn!(target: "studio.ws", connection_id = %connection_id, error = %e, "Writer task failed");
    }
}

/// Parse one client text frame and dispatch it. Malformed frames are logged
/// and ignored.
pub(crate) fn handle_text_frame(broker: &SignalingBroker, connection_id: &ConnectionId, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            metrics::record_frame_rejected();
            debug!(
                target: "studio.ws",
                connection_id = %connection_id,
                error = %e,
                "Malformed frame ignored"
            );
            return;
        }
    };

    match frame {
        ClientFrame::JoinRoom {
            room_id,
            participant_id,
        } => match broker.join_room(connection_id, &room_id, participant_id.as_ref()) {
            Ok(members) => {
                let ack = ServerEvent::room_joined(&room_id, &members);
                if broker.registry().deliver(connection_id, ack).is_err() {
                    debug!(target: "studio.ws", connection_id = %connection_id, "Join ack dropped");
                }
            }
            Err(e) => {
                warn!(target: "studio.ws", connection_id = %connection_id, error = %e, "Join failed");
            }
        },
        ClientFrame::LeaveRoom { room_id } => {
            broker.leave_room(connection_id, &room_id);
        }
        ClientFrame::Offer(signal) => relay(broker, connection_id, SignalEvent::Offer, &signal),
        ClientFrame::Answer(signal) => relay(broker, connection_id, SignalEvent::Answer, &signal),
        ClientFrame::IceCandidate(signal) => {
            relay(broker, connection_id, SignalEvent::IceCandidate, &signal);
        }
    }
}

fn relay(
    broker: &SignalingBroker,
    connection_id: &ConnectionId,
    event: SignalEvent,
    signal: &SignalFrame,
) {
    broker.forward(
        connection_id,
        event,
        signal.room_id.as_ref(),
        signal.payload.as_ref(),
        signal.target_connection_id.as_ref(),
    );
}

async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerEvent>,
    connection_id: ConnectionId,
    cancel_token: CancellationToken,
) {
    let mut ping_timer = tokio::time::interval(PING_INTERVAL);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = ping_timer.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(target: "studio.ws", connection_id = %connection_id, error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    debug!(target: "studio.ws", connection_id = %connection_id, "Send failed, writer stopping");
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::presence::{ConnectionRegistry, MembershipTable};
    use crate::types::RoomId;
    use serde_json::json;

    fn broker() -> SignalingBroker {
        SignalingBroker::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(MembershipTable::new()),
        )
    }

    #[tokio::test]
    async fn test_join_frame_acks_with_members() {
        let broker = broker();
        let (tx, mut rx) = mpsc::channel(8);
        let conn = broker.connect(tx).unwrap();

        handle_text_frame(
            &broker,
            &conn,
            r#"{"event":"join_room","room_id":"r1"}"#,
        );

        let ack = rx.try_recv().unwrap();
        assert_eq!(ack.event, "room_joined");
        assert_eq!(ack.room_id, Some(RoomId::from("r1")));
        assert_eq!(ack.payload["members"], json!([conn.as_str()]));
    }

    #[tokio::test]
    async fn test_malformed_frame_is_ignored() {
        let broker = broker();
        let (tx, mut rx) = mpsc::channel(8);
        let conn = broker.connect(tx).unwrap();

        handle_text_frame(&broker, &conn, "not json");
        handle_text_frame(&broker, &conn, r#"{"event":"unknown"}"#);

        assert!(rx.try_recv().is_err());
        assert!(broker.registry().exists(&conn));
    }

    #[tokio::test]
    async fn test_ice_frame_relayed_with_dashed_name() {
        let broker = broker();
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = broker.connect(tx_a).unwrap();
        let b = broker.connect(tx_b).unwrap();
        let room = RoomId::from("r1");
        broker.join_room(&a, &room, None).unwrap();
        broker.join_room(&b, &room, None).unwrap();

        handle_text_frame(
            &broker,
            &a,
            r#"{"event":"ice_candidate","room_id":"r1","payload":{"candidate":"c"}}"#,
        );

        let event = rx_b.try_recv().unwrap();
        assert_eq!(event.event, "ice-candidate");
        assert_eq!(event.sender_connection_id, Some(a));
        assert_eq!(event.payload, json!({"candidate": "c"}));
    }

    #[tokio::test]
    async fn test_leave_frame() {
        let broker = broker();
        let (tx, _rx) = mpsc::channel(8);
        let conn = broker.connect(tx).unwrap();
        let room = RoomId::from("r1");
        broker.join_room(&conn, &room, None).unwrap();

        handle_text_frame(&broker, &conn, r#"{"event":"leave_room","room_id":"r1"}"#);

        assert!(broker.membership().room_members(&room).is_empty());
    }
}
