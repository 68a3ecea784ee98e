use crate::data::{MediaSource, MetadataEvent, PlayerEvent};
use crate::helpers::markup::escape_html;
use crate::helpers::time_format::{format_hms, parse_hms};
use crate::metadata::{didl, MetadataStore};
use crate::players::listeners::{EventListener, ListenerRegistry};
use crate::players::Player;
use crate::remote::action::{RendererAction, TransportState};
use crate::remote::notification::{
    Notification, RELATIVE_COUNTER_POSITION, RELATIVE_TIME_POSITION, TRANSPORT_STATE,
};
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};
use log::{debug, info, warn};

/// Bridge between a DLNA control point and the Player / Metadata Store
///
/// Inbound actions are answered by [`RemoteControlAdapter::handle_action`].
/// Every reply is a string; an empty string means "no value". Commands the
/// player declines are logged but still answered, so the control point sees a
/// well-behaved renderer.
///
/// Outbound, Player events are turned into [`Notification`]s and fanned out
/// to the adapter's own listeners (normally the protocol server).
pub struct RemoteControlAdapter {
    player: Arc<Player>,
    metadata: Arc<MetadataStore>,
    /// HTML-escaped DIDL-Lite of the current track, served by GetTrackMetadata
    escaped_metadata: Mutex<Option<String>>,
    notifications: ListenerRegistry<Notification>,
}

impl RemoteControlAdapter {
    pub fn new(player: Arc<Player>, metadata: Arc<MetadataStore>) -> Arc<Self> {
        Arc::new(Self {
            player,
            metadata,
            escaped_metadata: Mutex::new(None),
            notifications: ListenerRegistry::new("remote"),
        })
    }

    /// Subscribe to Player and Metadata Store events
    ///
    /// The listeners hold a weak reference, so dropping the adapter silences
    /// them.
    pub fn attach(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.player.subscribe(move |event: &PlayerEvent| {
            if let Some(adapter) = weak.upgrade() {
                adapter.on_player_event(event);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(self);
        self.metadata.subscribe(move |event: &MetadataEvent| {
            if let Some(adapter) = weak.upgrade() {
                adapter.on_metadata_event(event);
            }
        });
        info!("Remote control adapter attached to player and metadata store");
    }

    pub fn register_listener(&self, listener: Arc<dyn EventListener<Notification>>) -> usize {
        self.notifications.register(listener)
    }

    pub fn subscribe<F>(&self, callback: F) -> usize
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.notifications.subscribe(callback)
    }

    /// Handle an action given by its wire name; unknown names get an empty reply
    pub fn handle_request(&self, name: &str, argument: &str) -> String {
        match RendererAction::from_str(name) {
            Ok(action) => self.handle_action(action, argument),
            Err(_) => {
                warn!("Unsupported renderer action '{}'", name);
                String::new()
            }
        }
    }

    /// Execute one action and return the reply value
    pub fn handle_action(&self, action: RendererAction, argument: &str) -> String {
        debug!("Renderer action {} ({})", action, argument);
        match action {
            RendererAction::GetMute => {
                let muted = self.player.mute_get();
                debug!("GetMute, return CurrentMute = {}", muted);
                u8::from(muted).to_string()
            }
            RendererAction::SetMute => {
                match parse_flag(argument) {
                    Some(mute) => {
                        if let Err(e) = self.player.mute_set(mute) {
                            warn!("SetMute {} failed: {}", mute, e);
                        }
                    }
                    None => warn!("SetMute with invalid value '{}'", argument),
                }
                String::new()
            }
            RendererAction::GetVolume => match self.player.volume_get() {
                Ok(volume) => {
                    debug!("GetVolume, return CurrentVolume = {}", volume);
                    volume.to_string()
                }
                Err(e) => {
                    warn!("GetVolume failed: {}", e);
                    String::new()
                }
            },
            RendererAction::SetVolume => {
                match argument.trim().parse::<i32>() {
                    Ok(volume) => {
                        if let Err(e) = self.player.volume_set(volume) {
                            warn!("SetVolume {} failed: {}", volume, e);
                        }
                    }
                    Err(_) => warn!("SetVolume with invalid value '{}'", argument),
                }
                String::new()
            }
            RendererAction::Play => {
                self.player.play();
                String::new()
            }
            RendererAction::Stop | RendererAction::Next | RendererAction::Previous => {
                self.player.stop();
                String::new()
            }
            RendererAction::Pause => {
                self.player.pause();
                String::new()
            }
            RendererAction::Seek => {
                match parse_hms(argument) {
                    Some(position) => {
                        if let Err(e) = self.player.seek(position) {
                            warn!("Seek to {} failed: {}", argument, e);
                        }
                    }
                    None => warn!("Seek with invalid target '{}'", argument),
                }
                String::new()
            }
            RendererAction::SetTrackUri => {
                info!("SetAVTransportURI, CurrentURI = {}", argument);
                self.player.set_source(MediaSource::remote_control(argument));
                self.player.play();
                String::new()
            }
            RendererAction::SetTrackMetadata => {
                self.set_track_metadata(argument);
                String::new()
            }
            RendererAction::GetTrackUri => self.player.source().url.unwrap_or_default(),
            RendererAction::GetPlaySpeed => "1".to_string(),
            RendererAction::GetPlayMode => "NORMAL".to_string(),
            RendererAction::GetTransportStatus => "OK".to_string(),
            RendererAction::GetTransportState => TransportState::from(self.player.state()).to_string(),
            RendererAction::GetTrackDuration | RendererAction::GetMediaDuration => {
                format_hms(self.track_duration())
            }
            RendererAction::GetTrackNo => "1".to_string(),
            RendererAction::GetTrackMetadata => self.escaped_metadata().unwrap_or_default(),
            RendererAction::GetPosAbsTime | RendererAction::GetPosRelTime => {
                format_hms(self.player.audio_time_secs())
            }
            RendererAction::GetPosAbsCount | RendererAction::GetPosRelCount => {
                self.player.audio_position().to_string()
            }
        }
    }

    /// Cached escaped DIDL-Lite, if any
    pub fn escaped_metadata(&self) -> Option<String> {
        self.escaped_metadata.lock().ok().and_then(|cache| cache.clone())
    }

    fn cache_metadata(&self, escaped: String) {
        match self.escaped_metadata.lock() {
            Ok(mut cache) => *cache = Some(escaped),
            Err(_) => warn!("Failed to acquire lock for escaped metadata cache"),
        }
    }

    /// Engine duration, or the metadata duration while the engine reports 0
    fn track_duration(&self) -> u32 {
        match self.player.audio_duration_secs() {
            0 => self.metadata.duration(),
            secs => secs,
        }
    }

    fn set_track_metadata(&self, xml: &str) {
        debug!("SetAVTransportURIMetaData, CurrentURIMetaData = {}", xml);
        // A control point's own metadata is not echoed back into the store
        if self.player.source().is_remote_control() {
            debug!("Source is remote control, metadata store left unchanged");
        } else {
            self.metadata.set_from_remote_xml(xml);
        }
        self.cache_metadata(escape_html(xml));
    }

    fn on_player_event(&self, event: &PlayerEvent) {
        match event {
            PlayerEvent::State { .. } => self.notify(Notification::AvTransport(TRANSPORT_STATE)),
            PlayerEvent::Volume { .. } | PlayerEvent::Mute { .. } => self.notify(Notification::RenderingControl),
            PlayerEvent::Position { .. } => {
                self.notify(Notification::AvTransport(RELATIVE_TIME_POSITION));
                self.notify(Notification::AvTransport(RELATIVE_COUNTER_POSITION));
            }
            PlayerEvent::Source { .. } | PlayerEvent::IcyMetadata { .. } => {}
        }
    }

    fn on_metadata_event(&self, event: &MetadataEvent) {
        let MetadataEvent::Changed { metadata } = event;
        if self.player.source().is_remote_control() {
            return;
        }
        let xml = didl::encode(metadata);
        debug!("XML metadata = {}", xml);
        self.cache_metadata(escape_html(&xml));
    }

    fn notify(&self, notification: Notification) {
        debug!("Notify {}", notification);
        self.notifications.fire(&notification);
    }
}

/// Mute flags arrive as "1"/"0" or "true"/"false"
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" => Some(true),
        "0" => Some(false),
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::NullAudioEngine;

    fn create_adapter() -> (Arc<NullAudioEngine>, Arc<Player>, Arc<MetadataStore>, Arc<RemoteControlAdapter>) {
        let engine = Arc::new(NullAudioEngine::new());
        let player = Player::new(engine.clone());
        let metadata = Arc::new(MetadataStore::new());
        let adapter = RemoteControlAdapter::new(player.clone(), metadata.clone());
        adapter.attach();
        (engine, player, metadata, adapter)
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("yes"), None);
    }

    #[test]
    fn test_constant_replies() {
        let (_engine, _player, _metadata, adapter) = create_adapter();
        assert_eq!(adapter.handle_action(RendererAction::GetPlaySpeed, ""), "1");
        assert_eq!(adapter.handle_action(RendererAction::GetPlayMode, ""), "NORMAL");
        assert_eq!(adapter.handle_action(RendererAction::GetTransportStatus, ""), "OK");
        assert_eq!(adapter.handle_action(RendererAction::GetTrackNo, ""), "1");
        assert_eq!(adapter.handle_action(RendererAction::GetTrackMetadata, ""), "");
        assert_eq!(adapter.handle_action(RendererAction::GetTrackUri, ""), "");
    }

    #[test]
    fn test_unknown_action_gets_empty_reply() {
        let (engine, _player, _metadata, adapter) = create_adapter();
        assert_eq!(adapter.handle_request("Reboot", "now"), "");
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_set_volume_invalid_is_ignored() {
        let (engine, player, _metadata, adapter) = create_adapter();
        player.volume_set(30).unwrap();
        engine.clear_calls();
        assert_eq!(adapter.handle_request("SetVolume", "loud"), "");
        assert!(engine.calls().is_empty());
        assert_eq!(adapter.handle_request("GetVolume", ""), "30");
    }

    #[test]
    fn test_duration_falls_back_to_metadata() {
        let (engine, _player, metadata, adapter) = create_adapter();
        metadata.set_track(Some("T"), None, None, 3725, None, None);
        assert_eq!(adapter.handle_action(RendererAction::GetTrackDuration, ""), "01:02:05");

        engine.set_duration_ms(90_500);
        assert_eq!(adapter.handle_action(RendererAction::GetMediaDuration, ""), "00:01:30");
    }

    #[test]
    fn test_position_queries() {
        let (engine, _player, _metadata, adapter) = create_adapter();
        engine.set_time_ms(3_723_000);
        engine.set_position(123_456);
        assert_eq!(adapter.handle_action(RendererAction::GetPosRelTime, ""), "01:02:03");
        assert_eq!(adapter.handle_action(RendererAction::GetPosAbsTime, ""), "01:02:03");
        assert_eq!(adapter.handle_action(RendererAction::GetPosRelCount, ""), "123456");
        assert_eq!(adapter.handle_action(RendererAction::GetPosAbsCount, ""), "123456");
    }

    #[test]
    fn test_metadata_change_refreshes_cache() {
        let (_engine, player, metadata, adapter) = create_adapter();
        player.set_source(MediaSource::internet_radio("http://radio"));
        metadata.set_track(Some("A & B"), None, None, 0, None, None);

        let cached = adapter.escaped_metadata().unwrap();
        assert!(cached.starts_with("&lt;DIDL-Lite"));
        assert!(cached.contains("A &amp;amp; B"));
    }

    #[test]
    fn test_metadata_change_ignored_for_remote_source() {
        let (_engine, player, metadata, adapter) = create_adapter();
        player.set_source(MediaSource::remote_control("http://cp/track.mp3"));
        metadata.set_track(Some("Local"), None, None, 0, None, None);
        assert_eq!(adapter.escaped_metadata(), None);
    }
}
