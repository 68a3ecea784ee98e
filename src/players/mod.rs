// Player, audio engine seam and event fan-out

pub mod audio_engine;
pub mod listeners;
pub mod null_engine;
pub mod player;
pub mod volume;

pub use audio_engine::{AudioEngine, EngineError, EngineEvent, EngineEventHandler, EngineStatus, StopMode};
pub use listeners::{EventListener, ListenerRegistry};
pub use null_engine::{EngineCall, NullAudioEngine};
pub use player::{state_for_status, Player, PlayerError};
pub use volume::NativeVolumeRange;
