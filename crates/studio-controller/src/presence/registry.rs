//! Connection registry.
//!
//! Owns every live connection: its connect timestamp and the sending half of
//! its outbound queue. Other components hold connection ids only.

use crate::errors::StudioError;
use crate::signaling::protocol::ServerEvent;
use crate::types::ConnectionId;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Why a single delivery did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection is not registered.
    NotConnected,
    /// The outbound queue is at capacity.
    QueueFull,
    /// The connection's writer has gone away.
    Closed,
}

impl DeliveryError {
    /// Bounded label for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeliveryError::NotConnected => "not_connected",
            DeliveryError::QueueFull => "queue_full",
            DeliveryError::Closed => "closed",
        }
    }
}

#[derive(Debug)]
struct ConnectionEntry {
    connected_at: DateTime<Utc>,
    outbound: mpsc::Sender<ServerEvent>,
}

/// Registry of live connections, keyed by connection id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with its outbound queue.
    ///
    /// # Errors
    ///
    /// Returns `StudioError::DuplicateConnection` if the id is already present.
    pub fn register(
        &self,
        id: ConnectionId,
        outbound: mpsc::Sender<ServerEvent>,
    ) -> Result<(), StudioError> {
        match self.connections.entry(id) {
            Entry::Occupied(entry) => Err(StudioError::DuplicateConnection(
                entry.key().to_string(),
            )),
            Entry::Vacant(entry) => {
                debug!(target: "studio.presence", connection_id = %entry.key(), "Connection registered");
                entry.insert(ConnectionEntry {
                    connected_at: Utc::now(),
                    outbound,
                });
                Ok(())
            }
        }
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn unregister(&self, id: &ConnectionId) {
        if self.connections.remove(id).is_some() {
            debug!(target: "studio.presence", connection_id = %id, "Connection unregistered");
        }
    }

    /// Whether the connection is registered.
    #[must_use]
    pub fn exists(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// When the connection was registered.
    #[must_use]
    pub fn connected_at(&self, id: &ConnectionId) -> Option<DateTime<Utc>> {
        self.connections.get(id).map(|entry| entry.connected_at)
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queue an event on a connection without waiting.
    ///
    /// The sender is cloned out of the map first so no shard lock is held
    /// while touching the channel.
    pub(crate) fn deliver(&self, id: &ConnectionId, event: ServerEvent) -> Result<(), DeliveryError> {
        let outbound = self
            .connections
            .get(id)
            .map(|entry| entry.outbound.clone())
            .ok_or(DeliveryError::NotConnected)?;

        outbound.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
