//! Signaling: wire protocol, room-scoped forwarding and the WebSocket
//! connection task.

pub mod broker;
pub mod connection;
pub mod forwarder;
pub mod protocol;

pub use broker::{ParticipantJoined, SignalingBroker};
pub use forwarder::{DropReason, ForwardOutcome, SignalingForwarder};
pub use protocol::{ClientFrame, ServerEvent, SignalEvent};
