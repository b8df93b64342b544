//! Pre-seeded studio rooms.
//!
//! `TestRoom` builds an [`InMemoryStudioStore`] holding one room's
//! participants and their sources, in the order they were added.

use std::sync::Arc;
use studio_controller::models::{AudioSource, SourceKind, VideoSource};
use studio_controller::repositories::InMemoryStudioStore;
use studio_controller::types::{ParticipantId, RoomId};

/// Builder for a seeded room.
#[derive(Debug)]
pub struct TestRoom {
    room_id: RoomId,
    store: Arc<InMemoryStudioStore>,
}

impl TestRoom {
    /// Start an empty room in a fresh store.
    #[must_use]
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            room_id: room_id.into(),
            store: Arc::new(InMemoryStudioStore::new()),
        }
    }

    /// Seed another room into the same store.
    #[must_use]
    pub fn with_room(room_id: impl Into<RoomId>, store: Arc<InMemoryStudioStore>) -> Self {
        Self {
            room_id: room_id.into(),
            store,
        }
    }

    #[must_use]
    pub fn with_participant(self, id: &str, name: &str) -> Self {
        self.store.add_participant(self.room_id.clone(), id, name);
        self
    }

    /// Microphone owned by `participant`.
    #[must_use]
    pub fn with_microphone(self, source_id: &str, participant: &str) -> Self {
        self.store.add_audio_source(AudioSource::new(
            source_id,
            format!("{participant} microphone"),
            SourceKind::Microphone,
            self.room_id.clone(),
            Some(ParticipantId::from(participant)),
        ));
        self
    }

    /// Camera owned by `participant`.
    #[must_use]
    pub fn with_camera(self, source_id: &str, participant: &str) -> Self {
        self.store.add_video_source(VideoSource::new(
            source_id,
            format!("{participant} camera"),
            SourceKind::Camera,
            self.room_id.clone(),
            Some(ParticipantId::from(participant)),
        ));
        self
    }

    /// Unowned music bed.
    #[must_use]
    pub fn with_music(self, source_id: &str) -> Self {
        self.store.add_audio_source(AudioSource::new(
            source_id,
            "Music",
            SourceKind::Music,
            self.room_id.clone(),
            None,
        ));
        self
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn store(&self) -> &Arc<InMemoryStudioStore> {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> Arc<InMemoryStudioStore> {
        self.store
    }
}

/// Three-person room `studio-a`: alice, bob and carol, each with a
/// microphone (`mic-<name>`) and camera (`cam-<name>`).
#[must_use]
pub fn three_person_room() -> TestRoom {
    ["alice", "bob", "carol"]
        .into_iter()
        .fold(TestRoom::new("studio-a"), |room, name| {
            room.with_participant(name, name)
                .with_microphone(&format!("mic-{name}"), name)
                .with_camera(&format!("cam-{name}"), name)
        })
}
