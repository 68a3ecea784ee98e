use crate::data::{MediaSource, Metadata, PlaybackState, PlayerEvent};
use crate::metadata::icy;
use crate::players::audio_engine::{AudioEngine, EngineError, EngineEvent, EngineEventHandler, EngineStatus, StopMode};
use crate::players::listeners::{EventListener, ListenerRegistry};
use crate::players::volume::{clamp_volume, NativeVolumeRange};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use log::{debug, info, warn};
use thiserror::Error;

/// Error types returned by the synchronous Player commands
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Audio engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Cannot {action} while muting: {source}")]
    Mute {
        action: &'static str,
        #[source]
        source: EngineError,
    },
}

/// Map an engine status report to the playback state it implies
///
/// Anything the engine reports that is not one of the five settled states is
/// treated as a transition.
pub fn state_for_status(status: EngineStatus) -> PlaybackState {
    match status {
        EngineStatus::Running => PlaybackState::Playing,
        EngineStatus::Paused => PlaybackState::Paused,
        EngineStatus::Stopped => PlaybackState::Stopped,
        EngineStatus::Finished => PlaybackState::Finished,
        EngineStatus::Error => PlaybackState::Error,
        EngineStatus::Unknown | EngineStatus::Initializing => PlaybackState::Transitioning,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MuteState {
    muted: bool,
    /// Logical volume to restore when unmuting
    stashed_volume: u8,
}

/// The single authority over what is playing and in which state
///
/// The Player owns the current media source and the playback state, turns
/// commands into audio engine calls and fans out [`PlayerEvent`]s. It holds no
/// thread of its own: methods run on whichever thread calls them, including
/// the engine's callback context.
pub struct Player {
    engine: Arc<dyn AudioEngine>,
    volume_range: NativeVolumeRange,
    source: RwLock<MediaSource>,
    state: RwLock<PlaybackState>,
    mute: Mutex<MuteState>,
    listeners: ListenerRegistry<PlayerEvent>,
}

impl Player {
    /// Create a Player driving the given engine and register it as the
    /// engine's event handler
    pub fn new(engine: Arc<dyn AudioEngine>) -> Arc<Self> {
        Self::with_volume_range(engine, NativeVolumeRange::default())
    }

    pub fn with_volume_range(engine: Arc<dyn AudioEngine>, volume_range: NativeVolumeRange) -> Arc<Self> {
        debug!("Creating Player on engine '{}'", engine.name());
        let player = Arc::new(Player {
            engine,
            volume_range,
            source: RwLock::new(MediaSource::none()),
            state: RwLock::new(PlaybackState::NoMedia),
            mute: Mutex::new(MuteState::default()),
            listeners: ListenerRegistry::new("player"),
        });

        let handler: Weak<dyn EngineEventHandler> = Arc::downgrade(&player) as Weak<dyn EngineEventHandler>;
        player.engine.set_event_handler(handler);
        player
    }

    /// Register a listener for player events
    pub fn register_listener(&self, listener: Arc<dyn EventListener<PlayerEvent>>) -> usize {
        self.listeners.register(listener)
    }

    /// Register a closure for player events
    pub fn subscribe<F>(&self, callback: F) -> usize
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    fn fire(&self, event: PlayerEvent) {
        debug!("Player event: {}", event.kind());
        self.listeners.fire(&event);
    }

    /// Get a copy of the current media source
    pub fn source(&self) -> MediaSource {
        match self.source.read() {
            Ok(source) => source.clone(),
            Err(_) => {
                warn!("Failed to acquire read lock for media source");
                MediaSource::none()
            }
        }
    }

    /// Replace the media source
    ///
    /// Playback of the old source is always stopped first so that two sources
    /// never feed the engine at the same time. The playback state itself is
    /// left to the engine callback.
    pub fn set_source(&self, source: MediaSource) {
        info!("Setting media source: {}", source);
        if let Err(e) = self.engine.stop(StopMode::Immediate) {
            warn!("Engine failed to stop before source change: {}", e);
        }

        match self.source.write() {
            Ok(mut current) => *current = source.clone(),
            Err(_) => {
                warn!("Failed to acquire write lock when setting media source");
                return;
            }
        }

        self.fire(PlayerEvent::Source { source });
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        match self.state.read() {
            Ok(state) => *state,
            Err(_) => {
                warn!("Failed to acquire read lock for playback state");
                PlaybackState::Error
            }
        }
    }

    fn set_state(&self, state: PlaybackState) {
        match self.state.write() {
            Ok(mut current) => *current = state,
            Err(_) => warn!("Failed to acquire write lock when setting playback state"),
        }
        self.fire(PlayerEvent::State { state });
    }

    /// Start or resume playback
    ///
    /// Returns `true` if a command was handed to the engine. Calling `play`
    /// without a source URL is logged and ignored.
    pub fn play(&self) -> bool {
        if self.engine.status() == EngineStatus::Paused {
            debug!("Resume");
            return match self.engine.resume() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Engine failed to resume: {}", e);
                    false
                }
            };
        }

        let source = self.source();
        let Some(url) = source.playable_url() else {
            warn!("Play command received but no stream URL set");
            return false;
        };

        debug!("Playing {}", url);
        if self.engine.status() != EngineStatus::Running {
            self.set_state(PlaybackState::Transitioning);
        }

        match self.engine.play(url) {
            Ok(()) => true,
            Err(e) => {
                warn!("Engine failed to play {}: {}", url, e);
                false
            }
        }
    }

    /// Pause playback; the resulting state arrives through the engine callback
    pub fn pause(&self) -> bool {
        debug!("Pause");
        match self.engine.pause() {
            Ok(()) => true,
            Err(e) => {
                warn!("Engine failed to pause: {}", e);
                false
            }
        }
    }

    /// Stop playback immediately
    pub fn stop(&self) -> bool {
        debug!("Stop");
        match self.engine.stop(StopMode::Immediate) {
            Ok(()) => true,
            Err(e) => {
                warn!("Engine failed to stop: {}", e);
                false
            }
        }
    }

    /// Seek to a position in seconds. Fires a `Position` event without
    /// waiting for the engine to confirm.
    pub fn seek(&self, position_secs: u32) -> Result<(), PlayerError> {
        debug!("Seek to {}s", position_secs);
        self.engine.seek(position_secs).map_err(|e| {
            warn!("Engine failed to seek to {}s: {}", position_secs, e);
            PlayerError::from(e)
        })?;
        self.fire(PlayerEvent::Position { position: position_secs });
        Ok(())
    }

    /// Set the logical volume
    ///
    /// Values outside 0-100 are clamped here, so every caller (GUI, remote
    /// control, settings) gets the same behaviour.
    pub fn volume_set(&self, volume: i32) -> Result<(), PlayerError> {
        let clamped = clamp_volume(volume);
        if i32::from(clamped) != volume {
            warn!("Volume {} out of range, clamped to {}", volume, clamped);
        }

        let native = self.volume_range.percent_to_native(clamped);
        debug!("Volume set = {} (native {})", clamped, native);
        self.engine.set_volume(native)?;
        self.fire(PlayerEvent::Volume { volume: clamped });
        Ok(())
    }

    /// Get the logical volume
    pub fn volume_get(&self) -> Result<u8, PlayerError> {
        let native = self.engine.volume()?;
        Ok(self.volume_range.native_to_percent(native))
    }

    pub fn mute_get(&self) -> bool {
        self.lock_mute().muted
    }

    /// The mute state survives a panicking holder; it is two plain values
    fn lock_mute(&self) -> MutexGuard<'_, MuteState> {
        self.mute.lock().unwrap_or_else(|poisoned| {
            warn!("Mute lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Mute or unmute
    ///
    /// Muting stashes the current volume and sets the volume to 0; unmuting
    /// restores the stash. Muting twice keeps the first stash. On failure the
    /// mute flag is left untouched.
    ///
    /// The mute lock is held from reading the stash until the new state is
    /// stored, so concurrent callers are serialized. Events fire after it is
    /// released.
    pub fn mute_set(&self, mute: bool) -> Result<(), PlayerError> {
        let applied_volume = {
            let mut state = self.lock_mute();
            if mute {
                let stashed_volume = if state.muted {
                    state.stashed_volume
                } else {
                    let native = self.engine.volume().map_err(|source| PlayerError::Mute {
                        action: "read volume",
                        source,
                    })?;
                    self.volume_range.native_to_percent(native)
                };
                self.apply_mute_volume(0, "set volume to 0")?;
                *state = MuteState { muted: true, stashed_volume };
                Some(0)
            } else if state.muted {
                self.apply_mute_volume(state.stashed_volume, "restore volume")?;
                state.muted = false;
                Some(state.stashed_volume)
            } else {
                debug!("Unmute requested while not muted, volume left unchanged");
                None
            }
        };

        if let Some(volume) = applied_volume {
            self.fire(PlayerEvent::Volume { volume });
        }
        self.fire(PlayerEvent::Mute { muted: mute });
        Ok(())
    }

    fn apply_mute_volume(&self, volume: u8, action: &'static str) -> Result<(), PlayerError> {
        let native = self.volume_range.percent_to_native(volume);
        self.engine
            .set_volume(native)
            .map_err(|source| PlayerError::Mute { action, source })
    }

    /// Elapsed playback time in whole seconds
    pub fn audio_time_secs(&self) -> u32 {
        (self.engine.time_ms() / 1000) as u32
    }

    /// Duration of the current track in whole seconds, 0 if unknown
    pub fn audio_duration_secs(&self) -> u32 {
        (self.engine.duration_ms() / 1000) as u32
    }

    /// Byte position in the current stream
    pub fn audio_position(&self) -> u64 {
        self.engine.position()
    }

    /// React to an engine status report. Every report fires a `State` event,
    /// repeated identical states included.
    pub fn handle_engine_status(&self, status: EngineStatus) {
        let state = state_for_status(status);
        debug!("Audio engine status {} -> playback state {}", status, state);
        self.set_state(state);
    }

    /// Parse an inline ICY block and fan it out as `IcyMetadata`
    pub fn handle_icy_metadata(&self, text: &str) {
        info!("ICY metadata found in http stream: [{}]", text);
        match icy::parse_stream_title(text) {
            Ok(Some(title)) => self.fire(PlayerEvent::IcyMetadata {
                metadata: Metadata::with_title(title),
            }),
            Ok(None) => debug!("ICY metadata without usable StreamTitle"),
            Err(e) => warn!("Cannot parse ICY metadata: {}", e),
        }
    }
}

impl EngineEventHandler for Player {
    fn on_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Status(status) => self.handle_engine_status(status),
            EngineEvent::IcyMetadata(text) => self.handle_icy_metadata(&text),
            EngineEvent::IcyHeader(header) => debug!("ICY header found in http stream: [{}]", header),
        }
    }
}
