//! Studio domain models: sources, routes, outputs and the matrix snapshot.

use crate::routing::levels::Level;
use crate::types::{DestinationId, Medium, ParticipantId, RoomId, RouteId, SourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default quality label for video routes.
pub const DEFAULT_VIDEO_QUALITY: &str = "1080p";

/// Default capture resolution for video sources.
pub const DEFAULT_RESOLUTION: &str = "1920x1080";

/// Default capture frame rate for video sources.
pub const DEFAULT_FPS: u32 = 30;

/// Kind of capture device behind a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Microphone,
    Music,
    Camera,
    Screen,
}

impl SourceKind {
    /// Medium this kind produces.
    #[must_use]
    pub const fn medium(&self) -> Medium {
        match self {
            SourceKind::Microphone | SourceKind::Music => Medium::Audio,
            SourceKind::Camera | SourceKind::Screen => Medium::Video,
        }
    }
}

/// An audio source in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: SourceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub participant_id: Option<ParticipantId>,
    pub room_id: RoomId,
    pub is_enabled: bool,
    pub is_muted: bool,
    pub volume: Level,
    pub gain: Level,
    pub created_at: DateTime<Utc>,
}

impl AudioSource {
    /// New enabled, unmuted source with default levels.
    pub fn new(
        id: impl Into<SourceId>,
        name: impl Into<String>,
        kind: SourceKind,
        room_id: impl Into<RoomId>,
        participant_id: Option<ParticipantId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            participant_id,
            room_id: room_id.into(),
            is_enabled: true,
            is_muted: false,
            volume: Level::DEFAULT_VOLUME,
            gain: Level::DEFAULT_GAIN,
            created_at: Utc::now(),
        }
    }
}

/// A video source in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSource {
    pub id: SourceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub participant_id: Option<ParticipantId>,
    pub room_id: RoomId,
    pub is_enabled: bool,
    pub resolution: String,
    pub fps: u32,
    pub created_at: DateTime<Utc>,
}

impl VideoSource {
    /// New enabled source at the default resolution and frame rate.
    pub fn new(
        id: impl Into<SourceId>,
        name: impl Into<String>,
        kind: SourceKind,
        room_id: impl Into<RoomId>,
        participant_id: Option<ParticipantId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            participant_id,
            room_id: room_id.into(),
            is_enabled: true,
            resolution: DEFAULT_RESOLUTION.to_string(),
            fps: DEFAULT_FPS,
            created_at: Utc::now(),
        }
    }
}

/// Either kind of source.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Audio(AudioSource),
    Video(VideoSource),
}

impl Source {
    #[must_use]
    pub fn id(&self) -> &SourceId {
        match self {
            Source::Audio(s) => &s.id,
            Source::Video(s) => &s.id,
        }
    }

    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        match self {
            Source::Audio(s) => &s.room_id,
            Source::Video(s) => &s.room_id,
        }
    }

    #[must_use]
    pub fn participant_id(&self) -> Option<&ParticipantId> {
        match self {
            Source::Audio(s) => s.participant_id.as_ref(),
            Source::Video(s) => s.participant_id.as_ref(),
        }
    }

    #[must_use]
    pub fn medium(&self) -> Medium {
        match self {
            Source::Audio(_) => Medium::Audio,
            Source::Video(_) => Medium::Video,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Source::Audio(s) => s.created_at,
            Source::Video(s) => s.created_at,
        }
    }
}

/// A room participant as the routing matrix sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub name: String,
}

/// Per-medium route parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediumParams {
    #[serde(default)]
    pub volume: Option<Level>,
    #[serde(default)]
    pub quality: Option<String>,
}

impl MediumParams {
    /// Defaults used by auto-routing: volume for audio, quality for video.
    #[must_use]
    pub fn defaults_for(medium: Medium) -> Self {
        match medium {
            Medium::Audio => Self {
                volume: Some(Level::DEFAULT_VOLUME),
                quality: None,
            },
            Medium::Video => Self {
                volume: None,
                quality: Some(DEFAULT_VIDEO_QUALITY.to_string()),
            },
        }
    }

    /// Fill absent fields with the medium's defaults.
    #[must_use]
    pub fn or_defaults(self, medium: Medium) -> Self {
        let defaults = Self::defaults_for(medium);
        Self {
            volume: self.volume.or(defaults.volume),
            quality: self.quality.or(defaults.quality),
        }
    }
}

/// Directed mapping from one source to a set of destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub room_id: RoomId,
    #[serde(rename = "type")]
    pub medium: Medium,
    pub source_id: SourceId,
    /// Unique, kept in insertion order for display.
    pub destinations: Vec<DestinationId>,
    pub is_active: bool,
    pub volume: Option<Level>,
    pub quality: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// New active route. Destinations are deduplicated, keeping the first
    /// occurrence of each.
    pub fn new(
        room_id: RoomId,
        medium: Medium,
        source_id: SourceId,
        destinations: Vec<DestinationId>,
        params: MediumParams,
    ) -> Self {
        Self {
            id: RouteId::generate(),
            room_id,
            medium,
            source_id,
            destinations: dedup_preserving_order(destinations),
            is_active: true,
            volume: params.volume,
            quality: params.quality,
            created_at: Utc::now(),
        }
    }

    /// Append a destination unless already present. Returns whether it changed.
    pub fn add_destination(&mut self, destination: DestinationId) -> bool {
        if self.destinations.contains(&destination) {
            return false;
        }
        self.destinations.push(destination);
        true
    }

    /// Remove a destination if present. Returns whether it changed.
    pub fn remove_destination(&mut self, destination: &DestinationId) -> bool {
        let before = self.destinations.len();
        self.destinations.retain(|d| d != destination);
        self.destinations.len() != before
    }
}

pub(crate) fn dedup_preserving_order(destinations: Vec<DestinationId>) -> Vec<DestinationId> {
    let mut seen = std::collections::HashSet::new();
    destinations
        .into_iter()
        .filter(|d| seen.insert(d.clone()))
        .collect()
}

/// Partial route update; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteUpdate {
    #[serde(default)]
    pub destinations: Option<Vec<DestinationId>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub volume: Option<Level>,
    #[serde(default)]
    pub quality: Option<String>,
}

impl RouteUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_none()
            && self.is_active.is_none()
            && self.volume.is_none()
            && self.quality.is_none()
    }

    /// Apply to `route`. Returns whether anything changed.
    pub fn apply(self, route: &mut Route) -> bool {
        let before = route.clone();
        if let Some(destinations) = self.destinations {
            route.destinations = dedup_preserving_order(destinations);
        }
        if let Some(is_active) = self.is_active {
            route.is_active = is_active;
        }
        if let Some(volume) = self.volume {
            route.volume = Some(volume);
        }
        if let Some(quality) = self.quality {
            route.quality = Some(quality);
        }
        *route != before
    }
}

/// Symbolic destination outside the room, such as an OBS input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOutput {
    pub id: DestinationId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ExternalOutput {
    fn obs(id: &str, name: &str) -> Self {
        Self {
            id: DestinationId::from(id),
            name: name.to_string(),
            kind: "obs".to_string(),
        }
    }
}

/// Fixed catalog of external outputs plus the per-medium auto-route default.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputCatalog {
    outputs: Vec<ExternalOutput>,
    default_audio: DestinationId,
    default_video: DestinationId,
}

impl Default for OutputCatalog {
    fn default() -> Self {
        Self::new(
            DestinationId::from(crate::config::DEFAULT_AUDIO_OUTPUT),
            DestinationId::from(crate::config::DEFAULT_VIDEO_OUTPUT),
        )
    }
}

impl OutputCatalog {
    /// OBS catalog with the given auto-route defaults.
    pub fn new(default_audio: DestinationId, default_video: DestinationId) -> Self {
        Self {
            outputs: vec![
                ExternalOutput::obs("obs_main", "OBS Main Mix"),
                ExternalOutput::obs("obs_camera1", "OBS Camera 1"),
                ExternalOutput::obs("obs_camera2", "OBS Camera 2"),
                ExternalOutput::obs("obs_audio1", "OBS Audio 1"),
                ExternalOutput::obs("obs_audio2", "OBS Audio 2"),
            ],
            default_audio,
            default_video,
        }
    }

    #[must_use]
    pub fn outputs(&self) -> &[ExternalOutput] {
        &self.outputs
    }

    /// Output that auto-created routes of `medium` deliver to.
    #[must_use]
    pub fn default_for(&self, medium: Medium) -> &DestinationId {
        match medium {
            Medium::Audio => &self.default_audio,
            Medium::Video => &self.default_video,
        }
    }
}

/// Everything a routing UI needs for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMatrixSnapshot {
    pub room_id: RoomId,
    pub audio_sources: Vec<AudioSource>,
    pub video_sources: Vec<VideoSource>,
    pub routes: Vec<Route>,
    pub participants: Vec<ParticipantSummary>,
    #[serde(rename = "obs_outputs")]
    pub external_outputs: Vec<ExternalOutput>,
}
