//! In-memory implementation of every collaborator store.
//!
//! Lets the service run standalone and tests run without infrastructure.
//! Listing operations sort by creation/join time so results are stable;
//! same-instant ties fall back to id order (sources, routes) or insertion
//! order (participants).

use super::{ParticipantDirectory, RouteStore, SourceDirectory};
use crate::errors::StudioError;
use crate::models::{AudioSource, ParticipantSummary, Route, Source, VideoSource};
use crate::routing::levels::Level;
use crate::types::{Medium, ParticipantId, RoomId, RouteId, SourceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct ParticipantRecord {
    summary: ParticipantSummary,
    room_id: RoomId,
    joined_at: DateTime<Utc>,
    // Tiebreak for participants added within the same clock tick
    seq: u64,
}

/// Sources, participants and routes held in concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryStudioStore {
    audio_sources: DashMap<SourceId, AudioSource>,
    video_sources: DashMap<SourceId, VideoSource>,
    participants: DashMap<ParticipantId, ParticipantRecord>,
    routes: DashMap<RouteId, Route>,
    next_seq: AtomicU64,
}

impl InMemoryStudioStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a participant in a room.
    pub fn add_participant(
        &self,
        room_id: impl Into<RoomId>,
        participant_id: impl Into<ParticipantId>,
        name: impl Into<String>,
    ) {
        let id = participant_id.into();
        self.participants.insert(
            id.clone(),
            ParticipantRecord {
                summary: ParticipantSummary {
                    id,
                    name: name.into(),
                },
                room_id: room_id.into(),
                joined_at: Utc::now(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    pub fn add_audio_source(&self, source: AudioSource) {
        self.audio_sources.insert(source.id.clone(), source);
    }

    pub fn add_video_source(&self, source: VideoSource) {
        self.video_sources.insert(source.id.clone(), source);
    }

    /// Drop a source of either medium. Returns whether one was removed.
    pub fn remove_source(&self, source_id: &SourceId) -> bool {
        let audio = self.audio_sources.remove(source_id).is_some();
        let video = self.video_sources.remove(source_id).is_some();
        audio || video
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

#[async_trait]
impl SourceDirectory for InMemoryStudioStore {
    async fn get_source(
        &self,
        medium: Medium,
        source_id: &SourceId,
    ) -> Result<Option<Source>, StudioError> {
        Ok(match medium {
            Medium::Audio => self
                .audio_sources
                .get(source_id)
                .map(|s| Source::Audio(s.clone())),
            Medium::Video => self
                .video_sources
                .get(source_id)
                .map(|s| Source::Video(s.clone())),
        })
    }

    async fn get_sources_by_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<Source>, StudioError> {
        let owned_by = |owner: &Option<ParticipantId>| owner.as_ref() == Some(participant_id);

        let mut audio: Vec<AudioSource> = self
            .audio_sources
            .iter()
            .filter(|s| owned_by(&s.participant_id))
            .map(|s| s.clone())
            .collect();
        audio.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        let mut video: Vec<VideoSource> = self
            .video_sources
            .iter()
            .filter(|s| owned_by(&s.participant_id))
            .map(|s| s.clone())
            .collect();
        video.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        Ok(audio
            .into_iter()
            .map(Source::Audio)
            .chain(video.into_iter().map(Source::Video))
            .collect())
    }

    async fn list_sources(
        &self,
        room_id: &RoomId,
    ) -> Result<(Vec<AudioSource>, Vec<VideoSource>), StudioError> {
        let mut audio: Vec<AudioSource> = self
            .audio_sources
            .iter()
            .filter(|s| &s.room_id == room_id)
            .map(|s| s.clone())
            .collect();
        audio.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        let mut video: Vec<VideoSource> = self
            .video_sources
            .iter()
            .filter(|s| &s.room_id == room_id)
            .map(|s| s.clone())
            .collect();
        video.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        Ok((audio, video))
    }

    async fn update_audio_levels(
        &self,
        source_id: &SourceId,
        volume: Option<Level>,
        gain: Option<Level>,
    ) -> Result<Option<AudioSource>, StudioError> {
        Ok(self.audio_sources.get_mut(source_id).map(|mut source| {
            if let Some(volume) = volume {
                source.volume = volume;
            }
            if let Some(gain) = gain {
                source.gain = gain;
            }
            source.clone()
        }))
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryStudioStore {
    async fn list_participants(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ParticipantSummary>, StudioError> {
        let mut records: Vec<ParticipantRecord> = self
            .participants
            .iter()
            .filter(|p| &p.room_id == room_id)
            .map(|p| p.clone())
            .collect();
        records.sort_by_key(|p| (p.joined_at, p.seq));
        Ok(records.into_iter().map(|p| p.summary).collect())
    }

    async fn list_other_participants(
        &self,
        room_id: &RoomId,
        excluding: &ParticipantId,
    ) -> Result<Vec<ParticipantId>, StudioError> {
        Ok(self
            .list_participants(room_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .filter(|id| id != excluding)
            .collect())
    }
}

#[async_trait]
impl RouteStore for InMemoryStudioStore {
    async fn insert(&self, route: Route) -> Result<(), StudioError> {
        self.routes.insert(route.id.clone(), route);
        Ok(())
    }

    async fn get(&self, route_id: &RouteId) -> Result<Option<Route>, StudioError> {
        Ok(self.routes.get(route_id).map(|r| r.clone()))
    }

    async fn save(&self, route: Route) -> Result<(), StudioError> {
        match self.routes.get_mut(&route.id) {
            Some(mut existing) => {
                *existing = route;
                Ok(())
            }
            None => Err(StudioError::NotFound(format!("Route {} not found", route.id))),
        }
    }

    async fn delete(&self, route_id: &RouteId) -> Result<bool, StudioError> {
        Ok(self.routes.remove(route_id).is_some())
    }

    async fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<Route>, StudioError> {
        let mut routes: Vec<Route> = self
            .routes
            .iter()
            .filter(|r| &r.room_id == room_id)
            .map(|r| r.clone())
            .collect();
        routes.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(routes)
    }
}
