use std::sync::Weak;
use serde::{Serialize, Deserialize};
use strum_macros::Display;
use thiserror::Error;

/// Status values reported by the audio engine through its callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum EngineStatus {
    Unknown,
    Initializing,
    Running,
    Paused,
    Stopped,
    Finished,
    Error,
}

/// How the engine should terminate the current pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StopMode {
    /// Drop buffered audio and stop right away
    Immediate,
    /// Let buffered audio drain before stopping
    Normal,
}

/// Notifications delivered by the engine to its registered handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The pipeline changed status
    Status(EngineStatus),

    /// Inline ICY metadata block found in an HTTP stream
    IcyMetadata(String),

    /// ICY response headers of an HTTP stream
    IcyHeader(String),
}

/// Error types that can occur when commanding the audio engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine rejected {command}: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },

    #[error("Engine not available: {0}")]
    Unavailable(String),

    #[error("Volume control error: {0}")]
    Volume(String),
}

/// Callback interface the engine uses to report status and stream events
pub trait EngineEventHandler: Send + Sync {
    fn on_engine_event(&self, event: EngineEvent);
}

/// Audio decode/output pipeline
///
/// The pipeline itself is opaque; this is the thin wrapper the Player drives.
/// Volumes are in the engine's native range, times in milliseconds.
pub trait AudioEngine: Send + Sync {
    /// Name of the engine implementation (for log output)
    fn name(&self) -> &str;

    /// Start decoding and playing the given URL or local path
    fn play(&self, url: &str) -> Result<(), EngineError>;

    fn pause(&self) -> Result<(), EngineError>;

    fn resume(&self) -> Result<(), EngineError>;

    fn stop(&self, mode: StopMode) -> Result<(), EngineError>;

    /// Seek to a position in seconds from the start of the track
    fn seek(&self, position_secs: u32) -> Result<(), EngineError>;

    /// Set the output volume in native units
    fn set_volume(&self, native_volume: i32) -> Result<(), EngineError>;

    /// Get the output volume in native units
    fn volume(&self) -> Result<i32, EngineError>;

    /// Current pipeline status
    fn status(&self) -> EngineStatus;

    /// Elapsed playback time in milliseconds
    fn time_ms(&self) -> u64;

    /// Duration of the current track in milliseconds, 0 if unknown
    fn duration_ms(&self) -> u64;

    /// Byte position in the current stream
    fn position(&self) -> u64;

    /// Register the handler receiving status and stream events.
    /// Only one handler is kept; a later registration replaces it.
    fn set_event_handler(&self, handler: Weak<dyn EngineEventHandler>);
}
