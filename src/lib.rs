/// Plain data shared by all subsystems
pub mod data;

/// Player state machine, audio engine seam and event fan-out
pub mod players;

/// Track metadata store, ICY and DIDL-Lite parsing
pub mod metadata;

/// Remote-control (media renderer) adapter
pub mod remote;

/// Multipart image streams
pub mod stream;

/// HTTP client, settings database, radio directory and artwork helpers
pub mod helpers;

/// Composition root
pub mod appliance;

pub mod config;
pub mod logging;

pub use appliance::{Appliance, ApplianceError};
pub use data::{MediaSource, Metadata, PlaybackState, PlayerEvent, SourceType};
pub use players::Player;
