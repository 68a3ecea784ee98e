use std::fs::read_dir;
use std::path::Path;
use log::{debug, warn};

/// Check if a file is an audio file based on its extension
pub fn is_audio_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        return ["mp3", "flac", "ogg", "m4a", "wav", "aac", "opus", "wma"].contains(&ext.as_str());
    }
    false
}

/// Ordered tracks of one local folder plus the position of the track playing
///
/// Stepping past either end wraps around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlaylist {
    tracks: Vec<String>,
    cursor: usize,
}

impl LocalPlaylist {
    /// Playlist over the given tracks, positioned on the first one
    pub fn new(tracks: Vec<String>) -> Self {
        Self { tracks, cursor: 0 }
    }

    /// Audio files of the folder containing `track`, sorted by path and
    /// positioned on `track`
    ///
    /// When the folder cannot be listed, or does not contain `track`, the
    /// playlist holds `track` alone.
    pub fn for_track(track: &str) -> Self {
        let mut tracks = match Path::new(track).parent().filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => match read_dir(dir) {
                Ok(entries) => entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file() && is_audio_file(path))
                    .filter_map(|path| path.to_str().map(str::to_string))
                    .collect::<Vec<_>>(),
                Err(e) => {
                    warn!("Cannot list {}: {}", dir.display(), e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        tracks.sort();

        if !tracks.iter().any(|t| t == track) {
            debug!("{} not found in its folder listing, playing it alone", track);
            tracks = vec![track.to_string()];
        }

        let mut playlist = Self::new(tracks);
        playlist.select(track);
        debug!("Local playlist of {} tracks, at {}", playlist.len(), playlist.cursor);
        playlist
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, track: &str) -> bool {
        self.tracks.iter().any(|t| t == track)
    }

    pub fn current(&self) -> Option<&str> {
        self.tracks.get(self.cursor).map(String::as_str)
    }

    /// Move the cursor onto `track`; returns false if it is not listed
    pub fn select(&mut self, track: &str) -> bool {
        match self.tracks.iter().position(|t| t == track) {
            Some(index) => {
                self.cursor = index;
                true
            }
            None => false,
        }
    }

    /// Step forward, wrapping to the first track
    pub fn next(&mut self) -> Option<&str> {
        if self.tracks.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.tracks.len();
        self.current()
    }

    /// Step back, wrapping to the last track
    pub fn prev(&mut self) -> Option<&str> {
        if self.tracks.is_empty() {
            return None;
        }
        self.cursor = self.cursor.checked_sub(1).unwrap_or(self.tracks.len() - 1);
        self.current()
    }
}
