pub mod artwork;
pub mod http_client;
pub mod local_playlist;
pub mod markup;
pub mod settingsdb;
pub mod time_format;
pub mod tunein;

pub use artwork::{ArtworkError, ArtworkLoader};
pub use http_client::{HttpClient, HttpClientError, HttpStream, UreqHttpClient};
pub use local_playlist::LocalPlaylist;
pub use settingsdb::{SettingsDb, SettingsError, UserSettings};
pub use tunein::{TuneInClient, TuneInConfig, TuneInError};
