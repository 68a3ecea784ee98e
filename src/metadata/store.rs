use crate::data::{Metadata, MetadataEvent};
use crate::helpers::time_format::parse_hms;
use crate::metadata::{didl, icy, MetadataError};
use crate::players::listeners::{EventListener, ListenerRegistry};
use std::sync::{Arc, RwLock};
use log::{debug, info, warn};

/// Holds the single current-track record and notifies listeners whenever it
/// is replaced
///
/// Writers replace the record under a write lock; the `Changed` event is fired
/// after the lock has been released, so listeners may read the store again.
pub struct MetadataStore {
    current: RwLock<Metadata>,
    listeners: ListenerRegistry<MetadataEvent>,
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Metadata::default()),
            listeners: ListenerRegistry::new("metadata"),
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn EventListener<MetadataEvent>>) -> usize {
        self.listeners.register(listener)
    }

    pub fn subscribe<F>(&self, callback: F) -> usize
    where
        F: Fn(&MetadataEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Copy of the current record
    pub fn get(&self) -> Metadata {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(_) => {
                warn!("Failed to acquire read lock for metadata");
                Metadata::default()
            }
        }
    }

    /// Duration of the current track in seconds, 0 if unknown
    pub fn duration(&self) -> u32 {
        self.current.read().map(|current| current.duration).unwrap_or(0)
    }

    /// Replace the record with the given fields; empty strings become `None`.
    /// Always fires, even if nothing changed.
    pub fn set_track(
        &self,
        title: Option<&str>,
        album: Option<&str>,
        artist: Option<&str>,
        duration: u32,
        stream_url: Option<&str>,
        art_url: Option<&str>,
    ) {
        self.replace(Metadata::from_fields(title, album, artist, duration, stream_url, art_url));
    }

    /// Same as [`MetadataStore::set_track`] with the duration given as `HH:MM:SS`
    pub fn set_track_hms(
        &self,
        title: Option<&str>,
        album: Option<&str>,
        artist: Option<&str>,
        duration: &str,
        stream_url: Option<&str>,
        art_url: Option<&str>,
    ) -> Result<(), MetadataError> {
        let secs = parse_hms(duration).ok_or_else(|| MetadataError::InvalidDuration(duration.to_string()))?;
        self.set_track(title, album, artist, secs, stream_url, art_url);
        Ok(())
    }

    /// Replace the whole record
    pub fn replace(&self, metadata: Metadata) {
        info!("Metadata set: {}", metadata);
        match self.current.write() {
            Ok(mut current) => *current = metadata.clone(),
            Err(_) => {
                warn!("Failed to acquire write lock when setting metadata");
                return;
            }
        }
        self.listeners.fire(&MetadataEvent::Changed { metadata });
    }

    /// Take the title from an ICY block
    ///
    /// An absent tag or an empty title is not an error and leaves the record
    /// alone. On success only the title changes.
    pub fn set_from_icy(&self, text: &str) -> Result<(), MetadataError> {
        let Some(title) = icy::parse_stream_title(text)? else {
            debug!("No StreamTitle in ICY block, metadata unchanged");
            return Ok(());
        };

        let updated = match self.current.write() {
            Ok(mut current) => {
                current.title = Some(title);
                current.clone()
            }
            Err(_) => {
                warn!("Failed to acquire write lock when setting ICY title");
                return Ok(());
            }
        };
        info!("Metadata title from ICY: {}", updated.title.as_deref().unwrap_or(""));
        self.listeners.fire(&MetadataEvent::Changed { metadata: updated });
        Ok(())
    }

    /// Replace the record with the content of a DIDL-Lite blob
    pub fn set_from_remote_xml(&self, xml: &str) {
        debug!("Setting metadata from DIDL-Lite ({} bytes)", xml.len());
        self.replace(didl::decode(xml));
    }

    /// Current record as a DIDL-Lite blob
    pub fn to_remote_xml(&self) -> String {
        didl::encode(&self.get())
    }
}
