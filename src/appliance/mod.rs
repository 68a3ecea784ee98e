// Composition root wiring the player, metadata, remote control and streams
pub mod appliance;
pub mod local_playback;

pub use appliance::{Appliance, ApplianceError};
pub use local_playback::{LocalPlayback, LOCAL_COVER_FILE, LOCAL_STORAGE_ALBUM};
