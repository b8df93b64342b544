//! Identifier types shared across presence, signaling and routing.
//!
//! Identifiers are opaque strings on the wire. Wrapping each kind in its own
//! type keeps a room id from being passed where a connection id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of one live transport session.
    ConnectionId
);
string_id!(
    /// Identifier of a collaboration room.
    RoomId
);
string_id!(
    /// Identifier of a room participant.
    ParticipantId
);
string_id!(
    /// Identifier of an audio or video source.
    SourceId
);
string_id!(
    /// Identifier of a route.
    RouteId
);
string_id!(
    /// Route destination: a participant id or a symbolic external output id.
    DestinationId
);

impl ConnectionId {
    /// Generate a fresh random connection id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl RouteId {
    /// Generate a fresh random route id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<&ParticipantId> for DestinationId {
    fn from(participant: &ParticipantId) -> Self {
        Self(participant.0.clone())
    }
}

/// Media kind carried by a source or route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Audio,
    Video,
}

impl Medium {
    /// Returns the medium as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Medium::Audio => "audio",
            Medium::Video => "video",
        }
    }

    /// The other medium.
    #[must_use]
    pub const fn other(&self) -> Medium {
        match self {
            Medium::Audio => Medium::Video,
            Medium::Video => Medium::Audio,
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
