// Data structures shared by the player, metadata and remote-control layers

pub mod media_source;
pub mod metadata;
pub mod playback_state;
pub mod player_event;
pub mod radio_station;

// Re-export types from child modules
pub use media_source::*;
pub use metadata::*;
pub use playback_state::*;
pub use player_event::*;
pub use radio_station::*;
