use crate::players::audio_engine::{AudioEngine, EngineError, EngineEvent, EngineEventHandler, EngineStatus, StopMode};
use std::sync::{Mutex, RwLock, Weak};
use log::{debug, info, warn};

/// A command received by the [`NullAudioEngine`], kept in its call journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Play(String),
    Pause,
    Resume,
    Stop(StopMode),
    Seek(u32),
    SetVolume(i32),
}

#[derive(Debug)]
struct NullEngineState {
    status: EngineStatus,
    url: Option<String>,
    native_volume: i32,
    time_ms: u64,
    duration_ms: u64,
    position: u64,
    failing: bool,
    calls: Vec<EngineCall>,
}

/// An audio engine that renders nothing
///
/// It tracks status, volume and time like a real pipeline would and reports
/// status changes through the registered handler, synchronously on the calling
/// thread. Used by the console binary and the tests. Every command is recorded
/// in a call journal.
pub struct NullAudioEngine {
    state: Mutex<NullEngineState>,
    handler: RwLock<Option<Weak<dyn EngineEventHandler>>>,
    /// Whether status changes are reported back automatically
    auto_status: bool,
}

const NATIVE_MIN: i32 = -64;
const NATIVE_MAX: i32 = 64;

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NullAudioEngine {
    pub fn new() -> Self {
        debug!("Creating new NullAudioEngine");
        Self {
            state: Mutex::new(NullEngineState {
                status: EngineStatus::Unknown,
                url: None,
                native_volume: NATIVE_MIN,
                time_ms: 0,
                duration_ms: 0,
                position: 0,
                failing: false,
                calls: Vec::new(),
            }),
            handler: RwLock::new(None),
            auto_status: true,
        }
    }

    /// Disable automatic status callbacks; tests then drive them with
    /// [`NullAudioEngine::emit`]
    pub fn with_auto_status(mut self, enabled: bool) -> Self {
        self.auto_status = enabled;
        self
    }

    /// Make every following command fail
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.failing = failing;
        }
    }

    pub fn set_duration_ms(&self, duration_ms: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.duration_ms = duration_ms;
        }
    }

    pub fn set_time_ms(&self, time_ms: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.time_ms = time_ms;
        }
    }

    pub fn set_position(&self, position: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.position = position;
        }
    }

    /// URL of the last `play` command
    pub fn current_url(&self) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.url.clone())
    }

    /// Copy of the call journal
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().map(|state| state.calls.clone()).unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.clear();
        }
    }

    /// Deliver an event to the registered handler as if the pipeline raised it
    pub fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Status(status) = &event {
            if let Ok(mut state) = self.state.lock() {
                state.status = *status;
            }
        }

        let handler = match self.handler.read() {
            Ok(handler) => handler.as_ref().and_then(|weak| weak.upgrade()),
            Err(_) => {
                warn!("Failed to acquire read lock for engine event handler");
                None
            }
        };

        match handler {
            Some(handler) => handler.on_engine_event(event),
            None => debug!("No engine event handler registered, dropping {:?}", event),
        }
    }

    /// Record a command and apply its effect. The closure returns the new
    /// status when the command changes it. The lock is released before the
    /// status is reported.
    fn command<F>(&self, call: EngineCall, name: &'static str, apply: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut NullEngineState) -> Result<Option<EngineStatus>, EngineError>,
    {
        info!("NullAudioEngine: {:?}", call);
        let changed = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| EngineError::Unavailable("engine state lock poisoned".to_string()))?;
            if state.failing {
                return Err(EngineError::Rejected {
                    command: name,
                    reason: "engine is failing".to_string(),
                });
            }
            state.calls.push(call);
            apply(&mut state)?
        };

        if let Some(status) = changed {
            if self.auto_status {
                self.emit(EngineEvent::Status(status));
            } else if let Ok(mut state) = self.state.lock() {
                state.status = status;
            }
        }
        Ok(())
    }
}

impl AudioEngine for NullAudioEngine {
    fn name(&self) -> &str {
        "null"
    }

    fn play(&self, url: &str) -> Result<(), EngineError> {
        let url = url.to_string();
        self.command(EngineCall::Play(url.clone()), "play", move |state| {
            state.url = Some(url);
            state.time_ms = 0;
            state.position = 0;
            Ok(Some(EngineStatus::Running))
        })
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.command(EngineCall::Pause, "pause", |state| {
            Ok((state.status == EngineStatus::Running).then_some(EngineStatus::Paused))
        })
    }

    fn resume(&self) -> Result<(), EngineError> {
        self.command(EngineCall::Resume, "resume", |state| {
            Ok((state.status == EngineStatus::Paused).then_some(EngineStatus::Running))
        })
    }

    fn stop(&self, mode: StopMode) -> Result<(), EngineError> {
        self.command(EngineCall::Stop(mode), "stop", |state| {
            Ok(matches!(state.status, EngineStatus::Running | EngineStatus::Paused)
                .then_some(EngineStatus::Stopped))
        })
    }

    fn seek(&self, position_secs: u32) -> Result<(), EngineError> {
        self.command(EngineCall::Seek(position_secs), "seek", move |state| {
            state.time_ms = u64::from(position_secs) * 1000;
            Ok(None)
        })
    }

    fn set_volume(&self, native_volume: i32) -> Result<(), EngineError> {
        self.command(EngineCall::SetVolume(native_volume), "set_volume", move |state| {
            state.native_volume = native_volume.clamp(NATIVE_MIN, NATIVE_MAX);
            Ok(None)
        })
    }

    fn volume(&self) -> Result<i32, EngineError> {
        let state = self
            .state
            .lock()
            .map_err(|_| EngineError::Unavailable("engine state lock poisoned".to_string()))?;
        if state.failing {
            return Err(EngineError::Volume("engine is failing".to_string()));
        }
        Ok(state.native_volume)
    }

    fn status(&self) -> EngineStatus {
        self.state.lock().map(|state| state.status).unwrap_or(EngineStatus::Unknown)
    }

    fn time_ms(&self) -> u64 {
        self.state.lock().map(|state| state.time_ms).unwrap_or(0)
    }

    fn duration_ms(&self) -> u64 {
        self.state.lock().map(|state| state.duration_ms).unwrap_or(0)
    }

    fn position(&self) -> u64 {
        self.state.lock().map(|state| state.position).unwrap_or(0)
    }

    fn set_event_handler(&self, handler: Weak<dyn EngineEventHandler>) {
        match self.handler.write() {
            Ok(mut current) => *current = Some(handler),
            Err(_) => warn!("Failed to acquire write lock when setting engine event handler"),
        }
    }
}
