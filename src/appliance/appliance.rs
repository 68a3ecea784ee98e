use crate::config::ApplianceConfig;
use crate::data::{MediaSource, RadioStation};
use crate::helpers::artwork::{ArtworkError, ArtworkLoader};
use crate::helpers::http_client::{HttpClient, UreqHttpClient};
use crate::helpers::local_playlist::LocalPlaylist;
use crate::helpers::settingsdb::{SettingsDb, SettingsError, UserSettings};
use crate::helpers::tunein::{TuneInClient, TuneInError};
use crate::metadata::MetadataStore;
use crate::players::{AudioEngine, EventListener, Player, PlayerError};
use crate::appliance::local_playback::LocalPlayback;
use crate::remote::RemoteControlAdapter;
use crate::stream::{Frame, ImageFrameDecoder, MjpegStreamReader, StreamConfig, StreamError, StreamEvent};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplianceError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error("Radio directory error: {0}")]
    Radio(#[from] TuneInError),

    #[error("Camera stream error: {0}")]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Artwork(#[from] ArtworkError),

    #[error("Player refused to start {0}")]
    NotStarted(String),
}

/// The single instance of every component, wired together
///
/// Components never look each other up; the appliance hands each one the
/// references it needs at construction time.
pub struct Appliance {
    player: Arc<Player>,
    metadata: Arc<MetadataStore>,
    remote: Arc<RemoteControlAdapter>,
    local: Arc<LocalPlayback>,
    camera: MjpegStreamReader,
    settings: UserSettings,
    tunein: TuneInClient,
    artwork: ArtworkLoader,
    i2s_output: AtomicU8,
}

impl Appliance {
    /// Build the appliance from its configuration; the settings database is
    /// opened here
    pub fn new(engine: Arc<dyn AudioEngine>, config: &ApplianceConfig) -> Result<Self, ApplianceError> {
        let http: Arc<dyn HttpClient> = Arc::new(UreqHttpClient::with_max_response_size(
            config.http.timeout_secs,
            config.http.max_response_size,
        ));
        let db = match &config.settings.db_path {
            Some(path) => SettingsDb::open(path)?,
            None => {
                warn!("No settings database configured, settings will not survive a restart");
                SettingsDb::in_memory()?
            }
        };
        Ok(Self::with_components(engine, http, UserSettings::new(db), config))
    }

    /// Build the appliance around an existing HTTP client and settings store
    pub fn with_components(
        engine: Arc<dyn AudioEngine>,
        http: Arc<dyn HttpClient>,
        settings: UserSettings,
        config: &ApplianceConfig,
    ) -> Self {
        info!("Starting '{}'", config.remote.friendly_name);
        let player = Player::new(engine);
        let metadata = Arc::new(MetadataStore::new());
        let remote = RemoteControlAdapter::new(player.clone(), metadata.clone());
        remote.attach();
        let local = LocalPlayback::new(player.clone(), metadata.clone());
        local.attach();

        let camera = MjpegStreamReader::new(
            http.clone(),
            Arc::new(ImageFrameDecoder::new(config.camera.frame_width, config.camera.frame_height)),
            StreamConfig {
                synchronous_close: config.camera.synchronous_close,
            },
        );
        let artwork = ArtworkLoader::new(
            http.clone(),
            Arc::new(ImageFrameDecoder::new(config.artwork.max_width, config.artwork.max_height)),
        );
        let tunein = TuneInClient::new(http, config.tunein.clone());

        Self {
            player,
            metadata,
            remote,
            local,
            camera,
            settings,
            tunein,
            artwork,
            i2s_output: AtomicU8::new(0),
        }
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    pub fn remote(&self) -> &Arc<RemoteControlAdapter> {
        &self.remote
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn camera(&self) -> &MjpegStreamReader {
        &self.camera
    }

    pub fn i2s_output(&self) -> u8 {
        self.i2s_output.load(Ordering::SeqCst)
    }

    pub fn set_i2s_output(&self, output: u8) {
        debug!("Audio output route set to {}", output);
        self.i2s_output.store(output, Ordering::SeqCst);
    }

    /// Apply the persisted settings to the running components
    pub fn restore_settings(&self) -> Result<(), ApplianceError> {
        let volume = self.settings.audio_volume()?;
        let output = self.settings.i2s_output()?;
        info!("Restoring settings: volume {} output {}", volume, output);
        self.set_i2s_output(output);
        self.player.volume_set(i32::from(volume))?;
        Ok(())
    }

    /// Persist the current volume and output route
    pub fn save_settings(&self) -> Result<(), ApplianceError> {
        let volume = self.player.volume_get()?;
        let output = self.i2s_output();
        self.settings.set_audio_volume(volume)?;
        self.settings.set_i2s_output(output)?;
        info!("Settings saved: volume {} output {}", volume, output);
        Ok(())
    }

    pub fn radio_favorites(&self) -> Result<Vec<RadioStation>, ApplianceError> {
        Ok(self.tunein.favorites()?)
    }

    /// Resolve the station, select it, publish its metadata, then play
    pub fn play_station(&self, station: &mut RadioStation) -> Result<(), ApplianceError> {
        self.tunein.resolve_stream_url(station)?;
        let url = station.stream_url.clone().unwrap_or_default();

        self.player.set_source(MediaSource::internet_radio(url.as_str()));
        self.metadata.replace(station.to_metadata());
        if !self.player.play() {
            return Err(ApplianceError::NotStarted(url));
        }
        Ok(())
    }

    /// Play a file from local storage and record its metadata
    ///
    /// The files of its folder become the local playlist. Without an explicit
    /// art URL, a `cover.jpg` next to the file is used.
    pub fn play_local(&self, path: &str, art_url: Option<&str>) -> Result<(), ApplianceError> {
        self.local.play(path, art_url)
    }

    /// Next local track; a no-op unless the source is local storage
    pub fn next_local(&self) -> Result<bool, ApplianceError> {
        self.local.next()
    }

    /// Previous local track; a no-op unless the source is local storage
    pub fn prev_local(&self) -> Result<bool, ApplianceError> {
        self.local.prev()
    }

    pub fn local_playlist(&self) -> Option<LocalPlaylist> {
        self.local.playlist()
    }

    /// Decode the art of the current track, if it has one
    pub fn current_artwork(&self) -> Result<Option<Frame>, ApplianceError> {
        match self.metadata.get().art_url {
            Some(url) => Ok(Some(self.artwork.load(&url)?)),
            None => Ok(None),
        }
    }

    pub fn load_artwork(&self, url: &str) -> Result<Frame, ApplianceError> {
        Ok(self.artwork.load(url)?)
    }

    /// Start the camera stream; a running stream is closed first
    pub fn open_camera(&self, url: &str, listener: Arc<dyn EventListener<StreamEvent>>) -> Result<(), ApplianceError> {
        if self.camera.is_running() {
            debug!("Closing running camera stream before opening {}", url);
            self.camera.close();
        }
        self.camera.open(url, listener)?;
        Ok(())
    }

    pub fn close_camera(&self) {
        self.camera.close();
    }
}
