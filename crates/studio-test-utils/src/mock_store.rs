//! Collaborator stores that fail every call.
//!
//! Used to check that storage failures surface as `STORE_ERROR` without
//! leaking backend detail.

use async_trait::async_trait;
use studio_controller::errors::StudioError;
use studio_controller::models::{AudioSource, ParticipantSummary, Route, Source, VideoSource};
use studio_controller::repositories::{ParticipantDirectory, RouteStore, SourceDirectory};
use studio_controller::routing::Level;
use studio_controller::types::{Medium, ParticipantId, RoomId, RouteId, SourceId};

/// Store whose every operation returns [`StudioError::Store`].
#[derive(Debug, Clone)]
pub struct FailingStore {
    message: String,
}

impl FailingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_message("connection refused")
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn fail<T>(&self) -> Result<T, StudioError> {
        Err(StudioError::Store(self.message.clone()))
    }
}

impl Default for FailingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceDirectory for FailingStore {
    async fn get_source(
        &self,
        _medium: Medium,
        _source_id: &SourceId,
    ) -> Result<Option<Source>, StudioError> {
        self.fail()
    }

    async fn get_sources_by_participant(
        &self,
        _participant_id: &ParticipantId,
    ) -> Result<Vec<Source>, StudioError> {
        self.fail()
    }

    async fn list_sources(
        &self,
        _room_id: &RoomId,
    ) -> Result<(Vec<AudioSource>, Vec<VideoSource>), StudioError> {
        self.fail()
    }

    async fn update_audio_levels(
        &self,
        _source_id: &SourceId,
        _volume: Option<Level>,
        _gain: Option<Level>,
    ) -> Result<Option<AudioSource>, StudioError> {
        self.fail()
    }
}

#[async_trait]
impl ParticipantDirectory for FailingStore {
    async fn list_participants(
        &self,
        _room_id: &RoomId,
    ) -> Result<Vec<ParticipantSummary>, StudioError> {
        self.fail()
    }

    async fn list_other_participants(
        &self,
        _room_id: &RoomId,
        _excluding: &ParticipantId,
    ) -> Result<Vec<ParticipantId>, StudioError> {
        self.fail()
    }
}

#[async_trait]
impl RouteStore for FailingStore {
    async fn insert(&self, _route: Route) -> Result<(), StudioError> {
        self.fail()
    }

    async fn get(&self, _route_id: &RouteId) -> Result<Option<Route>, StudioError> {
        self.fail()
    }

    async fn save(&self, _route: Route) -> Result<(), StudioError> {
        self.fail()
    }

    async fn delete(&self, _route_id: &RouteId) -> Result<bool, StudioError> {
        self.fail()
    }

    async fn list_by_room(&self, _room_id: &RoomId) -> Result<Vec<Route>, StudioError> {
        self.fail()
    }
}
