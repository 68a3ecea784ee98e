/// Coarse playback state derived from the audio engine status
use serde::{Serialize, Deserialize};
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum PlaybackState {
    /// Nothing loaded yet
    #[default]
    #[serde(rename = "nomedia")]
    NoMedia,
    /// Audio is being rendered
    Playing,
    /// Playback is paused
    Paused,
    /// Playback was stopped
    Stopped,
    /// The track played to its end
    Finished,
    /// Starting, buffering or any engine status without a direct mapping
    Transitioning,
    /// The engine reported an error
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::NoMedia => write!(f, "nomedia"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Finished => write!(f, "finished"),
            PlaybackState::Transitioning => write!(f, "transitioning"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}
