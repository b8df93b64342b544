//! Signaling broker.
//!
//! Ties the connection registry, membership table and forwarder together
//! behind the operations a transport needs: connect, join, leave, forward and
//! disconnect. Joining with a participant id emits a `ParticipantJoined`
//! event that the auto-router turns into routes.

use crate::errors::StudioError;
use crate::observability::metrics;
use crate::presence::{ConnectionRegistry, MembershipTable};
use crate::signaling::forwarder::{DropReason, ForwardOutcome, SignalingForwarder};
use crate::signaling::protocol::{ServerEvent, SignalEvent};
use crate::types::{ConnectionId, ParticipantId, RoomId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A participant-bound connection joined a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantJoined {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub connection_id: ConnectionId,
}

/// Presence and signaling facade shared by every connection task.
#[derive(Debug)]
pub struct SignalingBroker {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<MembershipTable>,
    forwarder: SignalingForwarder,
    join_events: Option<mpsc::UnboundedSender<ParticipantJoined>>,
}

impl SignalingBroker {
    pub fn new(registry: Arc<ConnectionRegistry>, membership: Arc<MembershipTable>) -> Self {
        let forwarder = SignalingForwarder::new(Arc::clone(&registry), Arc::clone(&membership));
        Self {
            registry,
            membership,
            forwarder,
            join_events: None,
        }
    }

    /// Publish participant joins on `sender`.
    #[must_use]
    pub fn with_join_events(mut self, sender: mpsc::UnboundedSender<ParticipantJoined>) -> Self {
        self.join_events = Some(sender);
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn membership(&self) -> &Arc<MembershipTable> {
        &self.membership
    }

    /// Register a new connection under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `StudioError::DuplicateConnection` on an id collision.
    pub fn connect(&self, outbound: mpsc::Sender<ServerEvent>) -> Result<ConnectionId, StudioError> {
        let connection_id = ConnectionId::generate();
        self.registry.register(connection_id.clone(), outbound)?;
        metrics::set_connections_active(self.registry.len());
        info!(target: "studio.signaling", connection_id = %connection_id, "Connection opened");
        Ok(connection_id)
    }

    /// Add a connection to a room.
    ///
    /// Returns the room's members after the join.
    ///
    /// # Errors
    ///
    /// Returns `StudioError::NotFound` if the connection is not registered.
    pub fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        participant_id: Option<&ParticipantId>,
    ) -> Result<Vec<ConnectionId>, StudioError> {
        if !self.registry.exists(connection_id) {
            return Err(StudioError::NotFound(format!(
                "Connection {} not found",
                connection_id
            )));
        }

        let added = self.membership.join(room_id, connection_id);
        metrics::set_rooms_active(self.membership.room_count());
        info!(
            target: "studio.signaling",
            connection_id = %connection_id,
            room_id = %room_id,
            participant_id = participant_id.map(ParticipantId::as_str),
            rejoin = !added,
            "Joined room"
        );

        // A repeat join only refreshes the room; routes already exist
        let publish = participant_id.filter(|_| added);
        if let (Some(participant_id), Some(events)) = (publish, &self.join_events) {
            let event = ParticipantJoined {
                room_id: room_id.clone(),
                participant_id: participant_id.clone(),
                connection_id: connection_id.clone(),
            };
            if events.send(event).is_err() {
                warn!(
                    target: "studio.signaling",
                    room_id = %room_id,
                    participant_id = %participant_id,
                    "Auto-router is not running, participant join not published"
                );
            }
        }

        let mut members: Vec<ConnectionId> =
            self.membership.room_members(room_id).into_iter().collect();
        members.sort();
        Ok(members)
    }

    /// Remove a connection from one room. Returns whether it was a member.
    pub fn leave_room(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let left = self.membership.leave(room_id, connection_id);
        if left {
            info!(
                target: "studio.signaling",
                connection_id = %connection_id,
                room_id = %room_id,
                "Left room"
            );
        }
        left
    }

    /// Relay a negotiation message. A frame without a room is dropped here;
    /// everything else is decided by the forwarder.
    pub fn forward(
        &self,
        sender: &ConnectionId,
        event: SignalEvent,
        room_id: Option<&RoomId>,
        payload: Option<&Value>,
        target: Option<&ConnectionId>,
    ) -> ForwardOutcome {
        let Some(room_id) = room_id else {
            metrics::record_signal_dropped(event, DropReason::MissingRoom);
            debug!(
                target: "studio.signaling",
                event = event.wire_name(),
                sender = %sender,
                "Signal without room dropped"
            );
            return ForwardOutcome::Dropped(DropReason::MissingRoom);
        };
        self.forwarder.forward(sender, event, room_id, payload, target)
    }

    /// Release a connection.
    ///
    /// Membership is removed before the registry entry, so a concurrent
    /// forward either sees the connection as a member with a live queue or
    /// not at all.
    pub fn disconnect(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let rooms = self.membership.leave_all(connection_id);
        self.registry.unregister(connection_id);
        metrics::set_connections_active(self.registry.len());
        info!(
            target: "studio.signaling",
            connection_id = %connection_id,
            rooms_left = rooms.len(),
            "Connection closed"
        );
        rooms
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn broker() -> SignalingBroker {
        SignalingBroker::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(MembershipTable::new()),
        )
    }

    #[tokio::test]
    async fn test_connect_assigns_unique_ids() {
        let broker = broker();
        let (tx, _rx) = mpsc::channel(4);

        let a = broker.connect(tx.clone()).unwrap();
        let b = broker.connect(tx).unwrap();

        assert_ne!(a, b);
        assert_eq!(broker.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_join_requires_registered_connection() {
        let broker = broker();

        let result = broker.join_room(&ConnectionId::from("ghost"), &RoomId::from("r1"), None);

        assert!(matches!(result, Err(StudioError::NotFound(_))));
        assert!(!broker.membership().contains_room(&RoomId::from("r1")));
    }

    #[tokio::test]
    async fn test_join_returns_members() {
        let broker = broker();
        let (tx, _rx) = mpsc::channel(4);
        let a = broker.connect(tx.clone()).unwrap();
        let b = broker.connect(tx).unwrap();
        let room = RoomId::from("r1");

        broker.join_room(&a, &room, None).unwrap();
        let members = broker.join_room(&b, &room, None).unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(members, expected);
    }

    #[tokio::test]
    async fn test_join_with_participant_publishes_event() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let broker = broker().with_join_events(events_tx);
        let (tx, _rx) = mpsc::channel(4);
        let conn = broker.connect(tx).unwrap();

        broker
            .join_room(&conn, &RoomId::from("r1"), Some(&ParticipantId::from("p1")))
            .unwrap();
        broker.join_room(&conn, &RoomId::from("r2"), None).unwrap();

        let event = events_rx.try_recv().unwrap();
        assert_eq!(event.room_id, RoomId::from("r1"));
        assert_eq!(event.participant_id, ParticipantId::from("p1"));
        assert_eq!(event.connection_id, conn);
        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_repeat_join_publishes_one_event() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let broker = broker().with_join_events(events_tx);
        let (tx, _rx) = mpsc::channel(4);
        let conn = broker.connect(tx).unwrap();
        let room = RoomId::from("r1");
        let participant = ParticipantId::from("a");

        broker.join_room(&conn, &room, Some(&participant)).unwrap();
        let members = broker.join_room(&conn, &room, Some(&participant)).unwrap();

        assert_eq!(members, vec![conn.clone()]);
        assert_eq!(events_rx.try_recv().unwrap().connection_id, conn);
        assert!(events_rx.try_recv().is_err(), "repeat join published again");

        // Leaving and coming back is a fresh join
        broker.leave_room(&conn, &room);
        broker.join_room(&conn, &room, Some(&participant)).unwrap();
        assert!(events_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_leaves_rooms_then_unregisters() {
        let broker = broker();
        let (tx, _rx) = mpsc::channel(4);
        let a = broker.connect(tx.clone()).unwrap();
        let b = broker.connect(tx).unwrap();
        broker.join_room(&a, &RoomId::from("r1"), None).unwrap();
        broker.join_room(&b, &RoomId::from("r1"), None).unwrap();
        broker.join_room(&a, &RoomId::from("r2"), None).unwrap();

        let mut rooms = broker.disconnect(&a);
        rooms.sort();

        assert_eq!(rooms, vec![RoomId::from("r1"), RoomId::from("r2")]);
        assert!(!broker.registry().exists(&a));
        assert_eq!(
            broker.membership().room_members(&RoomId::from("r1")),
            std::collections::HashSet::from([b])
        );
        assert!(broker.disconnect(&a).is_empty());
    }

    #[tokio::test]
    async fn test_forward_after_disconnect_drops() {
        let broker = broker();
        let (tx_a, _rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let a = broker.connect(tx_a).unwrap();
        let b = broker.connect(tx_b).unwrap();
        let room = RoomId::from("r1");
        broker.join_room(&a, &room, None).unwrap();
        broker.join_room(&b, &room, None).unwrap();

        broker.disconnect(&b);
        let outcome = broker.forward(
            &a,
            SignalEvent::Offer,
            Some(&room),
            Some(&json!({})),
            Some(&b),
        );

        assert_eq!(outcome, ForwardOutcome::Dropped(DropReason::TargetNotMember));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forward_without_room_dropped() {
        let broker = broker();
        let (tx, _rx) = mpsc::channel(4);
        let a = broker.connect(tx).unwrap();

        let outcome = broker.forward(&a, SignalEvent::Answer, None, Some(&json!({})), None);

        assert_eq!(outcome, ForwardOutcome::Dropped(DropReason::MissingRoom));
    }

    #[tokio::test]
    async fn test_leave_room() {
        let broker = broker();
        let (tx, _rx) = mpsc::channel(4);
        let a = broker.connect(tx).unwrap();
        let room = RoomId::from("r1");
        broker.join_room(&a, &room, None).unwrap();

        assert!(broker.leave_room(&a, &room));
        assert!(!broker.leave_room(&a, &room));
        assert!(broker.membership().contains_room(&room));
    }
}
