use crate::data::{MediaSource, Metadata, PlaybackState};
use serde::{Serialize, Deserialize};

/// Events fanned out by the Player to its listeners, in the order they happen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Playback state has changed (fired on every engine status report)
    State { state: PlaybackState },

    /// Logical volume (0-100) has been set
    Volume { volume: u8 },

    /// Mute flag has been set
    Mute { muted: bool },

    /// A new media source has been selected
    Source { source: MediaSource },

    /// A seek has been issued
    Position { position: u32 },

    /// Title parsed from an inline ICY tag; bypasses the metadata store
    IcyMetadata { metadata: Metadata },
}

impl PlayerEvent {
    /// Short name used in log output
    pub fn kind(&self) -> &'static str {
        match self {
            PlayerEvent::State { .. } => "state",
            PlayerEvent::Volume { .. } => "volume",
            PlayerEvent::Mute { .. } => "mute",
            PlayerEvent::Source { .. } => "source",
            PlayerEvent::Position { .. } => "position",
            PlayerEvent::IcyMetadata { .. } => "icy_metadata",
        }
    }
}

/// Events fanned out by the metadata store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetadataEvent {
    /// The current record has been replaced
    Changed { metadata: Metadata },
}
