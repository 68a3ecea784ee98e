use crate::appliance::appliance::ApplianceError;
use crate::data::{MediaSource, PlaybackState, PlayerEvent, SourceType};
use crate::helpers::local_playlist::LocalPlaylist;
use crate::metadata::MetadataStore;
use crate::players::Player;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use log::{debug, info, warn};
use url::Url;

/// Album label recorded for tracks played from local storage
pub const LOCAL_STORAGE_ALBUM: &str = "SD Card";

/// Cover file looked up next to a local track when no art URL is given
pub const LOCAL_COVER_FILE: &str = "cover.jpg";

/// Playback of files from local storage
///
/// Keeps the folder of the last chosen file as a playlist. Next and previous
/// step through it only while the player source is local storage, and a
/// finished local track advances to the next one.
pub struct LocalPlayback {
    player: Arc<Player>,
    metadata: Arc<MetadataStore>,
    playlist: Mutex<Option<LocalPlaylist>>,
}

impl LocalPlayback {
    pub fn new(player: Arc<Player>, metadata: Arc<MetadataStore>) -> Arc<Self> {
        Arc::new(Self {
            player,
            metadata,
            playlist: Mutex::new(None),
        })
    }

    /// Advance to the next track whenever a local track finishes
    pub fn attach(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.player.subscribe(move |event: &PlayerEvent| {
            if !matches!(event, PlayerEvent::State { state: PlaybackState::Finished }) {
                return;
            }
            if let Some(local) = weak.upgrade() {
                match local.next() {
                    Ok(true) => debug!("Finished local track, advanced to the next one"),
                    Ok(false) => {}
                    Err(e) => warn!("Cannot advance local playlist: {}", e),
                }
            }
        });
    }

    fn lock_playlist(&self) -> MutexGuard<'_, Option<LocalPlaylist>> {
        self.playlist.lock().unwrap_or_else(|poisoned| {
            warn!("Local playlist lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Copy of the current playlist, if a local file was ever chosen
    pub fn playlist(&self) -> Option<LocalPlaylist> {
        self.lock_playlist().clone()
    }

    /// Play a chosen file; its folder becomes the playlist
    pub fn play(&self, path: &str, art_url: Option<&str>) -> Result<(), ApplianceError> {
        {
            let mut playlist = self.lock_playlist();
            let reused = playlist.as_mut().is_some_and(|list| list.select(path));
            if !reused {
                *playlist = Some(LocalPlaylist::for_track(path));
            }
        }
        self.start(path, art_url)
    }

    /// Play the next file; returns false when the source is not local storage
    pub fn next(&self) -> Result<bool, ApplianceError> {
        self.step(|playlist| playlist.next().map(str::to_string))
    }

    /// Play the previous file; returns false when the source is not local storage
    pub fn prev(&self) -> Result<bool, ApplianceError> {
        self.step(|playlist| playlist.prev().map(str::to_string))
    }

    fn step<F>(&self, advance: F) -> Result<bool, ApplianceError>
    where
        F: FnOnce(&mut LocalPlaylist) -> Option<String>,
    {
        let source = self.player.source();
        if source.source_type != SourceType::LocalStorage {
            debug!("Ignoring local playlist step, source is {}", source.source_type);
            return Ok(false);
        }

        // Released before playing: the player may call back into us
        let track = self.lock_playlist().as_mut().and_then(advance);
        match track {
            Some(track) => {
                self.start(&track, None)?;
                Ok(true)
            }
            None => {
                debug!("Local playlist is empty");
                Ok(false)
            }
        }
    }

    /// Select, play and describe one file
    ///
    /// Without an explicit art URL, a `cover.jpg` next to the file is used.
    fn start(&self, path: &str, art_url: Option<&str>) -> Result<(), ApplianceError> {
        info!("Playing local file {}", path);
        self.player.set_source(MediaSource::local_storage(path));
        if !self.player.play() {
            return Err(ApplianceError::NotStarted(path.to_string()));
        }

        let title = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);
        let cover = match art_url {
            Some(url) => Some(url.to_string()),
            None => local_cover_url(path),
        };
        let duration = self.player.audio_duration_secs();
        self.metadata.set_track(
            Some(title),
            Some(LOCAL_STORAGE_ALBUM),
            None,
            duration,
            Some(path),
            cover.as_deref(),
        );
        Ok(())
    }
}

/// `file://` URL of the cover image in the folder of a local track
fn local_cover_url(path: &str) -> Option<String> {
    let folder = Path::new(path).parent()?;
    Url::from_file_path(folder.join(LOCAL_COVER_FILE))
        .ok()
        .map(|url| url.to_string())
}
