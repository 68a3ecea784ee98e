use serde::{Serialize, Deserialize};
use strum_macros::{Display, EnumIter, EnumString};
use crate::data::PlaybackState;

/// Actions a DLNA control point can invoke on the renderer
///
/// Parsed from and printed as the action names used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum RendererAction {
    GetMute,
    SetMute,
    GetVolume,
    SetVolume,
    Play,
    Stop,
    Pause,
    Next,
    Previous,
    Seek,
    #[strum(serialize = "SetAVTransportURI")]
    #[serde(rename = "SetAVTransportURI")]
    SetTrackUri,
    #[strum(serialize = "SetAVTransportURIMetaData")]
    #[serde(rename = "SetAVTransportURIMetaData")]
    SetTrackMetadata,
    #[strum(serialize = "GetTrackURI")]
    #[serde(rename = "GetTrackURI")]
    GetTrackUri,
    GetPlaySpeed,
    GetPlayMode,
    GetTransportStatus,
    GetTransportState,
    GetTrackDuration,
    GetMediaDuration,
    GetTrackNo,
    GetTrackMetadata,
    GetPosAbsTime,
    GetPosRelTime,
    GetPosAbsCount,
    GetPosRelCount,
}

/// AVTransport `TransportState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportState {
    NoMediaPresent,
    Playing,
    PausedPlayback,
    Transitioning,
    Stopped,
}

impl From<PlaybackState> for TransportState {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::NoMedia => TransportState::NoMediaPresent,
            PlaybackState::Playing => TransportState::Playing,
            PlaybackState::Paused => TransportState::PausedPlayback,
            PlaybackState::Transitioning => TransportState::Transitioning,
            PlaybackState::Stopped | PlaybackState::Finished | PlaybackState::Error => TransportState::Stopped,
        }
    }
}
