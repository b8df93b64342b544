//! JSON wire protocol for the signaling WebSocket.
//!
//! Client frames are tagged by `event`. Server frames always carry the event
//! name, and for relayed signals the room and the sender's connection id.

use crate::types::{ConnectionId, ParticipantId, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame received from a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        participant_id: Option<ParticipantId>,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    Offer(SignalFrame),
    Answer(SignalFrame),
    #[serde(alias = "ice-candidate")]
    IceCandidate(SignalFrame),
}

/// Body of an offer/answer/ICE frame.
///
/// Every field is optional on the wire; the broker drops frames missing a
/// room or a payload instead of closing the connection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SignalFrame {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub target_connection_id: Option<ConnectionId>,
}

/// Negotiation event kinds relayed between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalEvent {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalEvent {
    /// Event name as delivered to peers.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            SignalEvent::Offer => "offer",
            SignalEvent::Answer => "answer",
            SignalEvent::IceCandidate => "ice-candidate",
        }
    }
}

/// Frame sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_connection_id: Option<ConnectionId>,
}

impl ServerEvent {
    /// Greeting sent right after the upgrade, carrying the assigned id.
    #[must_use]
    pub fn connected(connection_id: &ConnectionId) -> Self {
        Self {
            event: "connected".to_string(),
            room_id: None,
            payload: serde_json::json!({ "connection_id": connection_id }),
            sender_connection_id: None,
        }
    }

    /// Acknowledgement of a join, listing the room's current members.
    #[must_use]
    pub fn room_joined(room_id: &RoomId, members: &[ConnectionId]) -> Self {
        Self {
            event: "room_joined".to_string(),
            room_id: Some(room_id.clone()),
            payload: serde_json::json!({ "members": members }),
            sender_connection_id: None,
        }
    }

    /// A relayed negotiation message.
    #[must_use]
    pub fn signal(
        event: SignalEvent,
        room_id: &RoomId,
        payload: Value,
        sender: &ConnectionId,
    ) -> Self {
        Self {
            event: event.wire_name().to_string(),
            room_id: Some(room_id.clone()),
            payload,
            sender_connection_id: Some(sender.clone()),
        }
    }
}
