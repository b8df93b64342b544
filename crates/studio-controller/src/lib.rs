//! Studio Controller Service Library
//!
//! This library provides the core of the Studio Controller - a single-process
//! coordinator for multi-participant audio/video studio rooms, responsible for:
//!
//! - Tracking live signaling connections and which rooms they have joined
//! - Relaying WebRTC negotiation messages (offer/answer/ICE) between peers
//! - Reclaiming abandoned rooms after a time-to-live
//! - Maintaining the per-room audio/video routing matrix
//!
//! # Architecture
//!
//! ```text
//! SignalingBroker
//! ├── ConnectionRegistry   (connection id -> connect time, outbound queue)
//! ├── MembershipTable      (room id -> member connections, last activity)
//! └── SignalingForwarder   (room-scoped fan-out, never echoes to the sender)
//!
//! RoomReaper task  ── reaps empty rooms from the MembershipTable after TTL
//! AutoRouter task  ── participant-joined events -> RoutingMatrix
//!
//! RoutingMatrix
//! ├── SourceDirectory      (collaborator: audio/video source records)
//! ├── ParticipantDirectory (collaborator: room participants)
//! └── RouteStore           (collaborator: route persistence)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Injected services**: registry, membership and matrix are constructed
//!   explicitly and shared via `Arc`, never process globals
//! - **Per-room serialization**: presence state lives in sharded maps so one
//!   room's operations are serialized while rooms proceed in parallel
//! - **Best-effort signaling**: forwards are at-most-once with no retry
//!
//! # Modules
//!
//! - [`presence`] - Connection registry and room membership table
//! - [`signaling`] - Forwarder, broker, wire protocol and per-connection task
//! - [`routing`] - Routing matrix and level clamping
//! - [`repositories`] - Collaborator store traits and the in-memory store
//! - [`tasks`] - Room reaper and auto-router background tasks
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with appropriate HTTP status codes

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod presence;
pub mod repositories;
pub mod routes;
pub mod routing;
pub mod signaling;
pub mod tasks;
pub mod types;
