//! Collaborator interfaces for the routing matrix.
//!
//! Durable storage of sources, participants and routes lives outside this
//! service. The matrix reaches it only through these traits, so the backing
//! store can be swapped without touching routing logic. Stores are dumb
//! persistence; consistency is enforced by the matrix.

pub mod memory;

pub use memory::InMemoryStudioStore;

use crate::errors::StudioError;
use crate::models::{AudioSource, ParticipantSummary, Route, Source, VideoSource};
use crate::routing::levels::Level;
use crate::types::{Medium, ParticipantId, RoomId, RouteId, SourceId};
use async_trait::async_trait;

/// Read access to audio/video sources plus level writes.
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// Look up a source of a specific medium.
    async fn get_source(
        &self,
        medium: Medium,
        source_id: &SourceId,
    ) -> Result<Option<Source>, StudioError>;

    /// All sources bound to a participant, in any room.
    async fn get_sources_by_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<Source>, StudioError>;

    /// All sources in a room, audio and video, in creation order.
    async fn list_sources(
        &self,
        room_id: &RoomId,
    ) -> Result<(Vec<AudioSource>, Vec<VideoSource>), StudioError>;

    /// Write volume and/or gain on an audio source. Returns the updated
    /// source, or `None` if it does not exist.
    async fn update_audio_levels(
        &self,
        source_id: &SourceId,
        volume: Option<Level>,
        gain: Option<Level>,
    ) -> Result<Option<AudioSource>, StudioError>;
}

/// Read access to room participants.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn list_participants(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ParticipantSummary>, StudioError>;

    /// Participants in the room other than `excluding`, in join order.
    async fn list_other_participants(
        &self,
        room_id: &RoomId,
        excluding: &ParticipantId,
    ) -> Result<Vec<ParticipantId>, StudioError>;
}

/// Route persistence.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn insert(&self, route: Route) -> Result<(), StudioError>;

    async fn get(&self, route_id: &RouteId) -> Result<Option<Route>, StudioError>;

    /// Overwrite an existing route.
    async fn save(&self, route: Route) -> Result<(), StudioError>;

    /// Returns whether a route was deleted.
    async fn delete(&self, route_id: &RouteId) -> Result<bool, StudioError>;

    /// Routes in a room, in creation order.
    async fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<Route>, StudioError>;
}
