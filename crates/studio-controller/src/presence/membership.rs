//! Room membership table.
//!
//! Maps each room to the connections that joined it plus a `last_active`
//! instant. Entries are created lazily on first join and only removed by the
//! reaper. Each room's state sits under one `DashMap` shard lock, so
//! operations on the same room are serialized and different rooms proceed in
//! parallel. No lock is held across an await point.

use crate::types::{ConnectionId, RoomId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug)]
struct RoomEntry {
    members: HashSet<ConnectionId>,
    last_active: Instant,
}

impl RoomEntry {
    fn new(now: Instant) -> Self {
        Self {
            members: HashSet::new(),
            last_active: now,
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.members.is_empty() && now.saturating_duration_since(self.last_active) >= ttl
    }
}

/// Room id -> joined connections and last activity.
#[derive(Debug, Default)]
pub struct MembershipTable {
    rooms: DashMap<RoomId, RoomEntry>,
}

impl MembershipTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// Idempotent; always refreshes `last_active`. Returns `true` if the
    /// connection was not already a member.
    pub fn join(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let now = Instant::now();
        let mut entry = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| RoomEntry::new(now));
        let added = entry.members.insert(connection_id.clone());
        entry.last_active = now;
        trace!(
            target: "studio.presence",
            room_id = %room_id,
            connection_id = %connection_id,
            members = entry.members.len(),
            "Connection joined room"
        );
        added
    }

    /// Remove a connection from one room.
    ///
    /// Returns `true` if it was a member. The room's `last_active` is
    /// refreshed only when membership changed.
    pub fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let Some(mut entry) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = entry.members.remove(connection_id);
        if removed {
            entry.last_active = Instant::now();
        }
        removed
    }

    /// Remove a connection from every room it belongs to.
    ///
    /// Returns the affected rooms. Each affected room's `last_active` is
    /// refreshed so its TTL starts counting from the departure.
    pub fn leave_all(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let now = Instant::now();
        let mut affected = Vec::new();
        for mut entry in self.rooms.iter_mut() {
            if entry.members.remove(connection_id) {
                entry.last_active = now;
                affected.push(entry.key().clone());
            }
        }
        if !affected.is_empty() {
            debug!(
                target: "studio.presence",
                connection_id = %connection_id,
                rooms = affected.len(),
                "Connection left all rooms"
            );
        }
        affected
    }

    /// Current members of a room; empty if the room is unknown.
    #[must_use]
    pub fn room_members(&self, room_id: &RoomId) -> HashSet<ConnectionId> {
        self.try_room_members(room_id).unwrap_or_default()
    }

    /// Current members of a room, or `None` if the room has no entry.
    ///
    /// Distinguishes an unknown room from a known but empty one.
    #[must_use]
    pub fn try_room_members(&self, room_id: &RoomId) -> Option<HashSet<ConnectionId>> {
        self.rooms.get(room_id).map(|entry| entry.members.clone())
    }

    /// Refresh a room's `last_active`. Unknown rooms are ignored.
    pub fn touch(&self, room_id: &RoomId) {
        if let Some(mut entry) = self.rooms.get_mut(room_id) {
            entry.last_active = Instant::now();
        }
    }

    /// Whether the room has an entry.
    #[must_use]
    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Number of rooms with an entry, empty or not.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// When the room was last active.
    #[must_use]
    pub fn last_active(&self, room_id: &RoomId) -> Option<Instant> {
        self.rooms.get(room_id).map(|entry| entry.last_active)
    }

    /// Delete every room that is empty and idle for at least `ttl`.
    ///
    /// Candidates are collected first, then each removal re-checks the
    /// condition under the room's shard lock. A join that lands before the
    /// removal keeps the room; one that lands after recreates it.
    pub fn reap_expired(&self, ttl: Duration, now: Instant) -> Vec<RoomId> {
        let candidates: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|entry| entry.is_expired(ttl, now))
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter(|room_id| {
                self.rooms
                    .remove_if(room_id, |_, entry| entry.is_expired(ttl, now))
                    .is_some()
            })
            .collect()
    }
}
