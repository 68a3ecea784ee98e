//! Remote-control scenarios driven through the adapter, the way a control
//! point would drive the renderer

#[path = "common/mod.rs"]
mod common;
use common::*;

use netplayer::data::{MediaSource, PlaybackState, SourceType};
use netplayer::metadata::MetadataStore;
use netplayer::players::{EngineCall, EngineEvent, EngineStatus, NullAudioEngine, Player};
use netplayer::remote::{Notification, RemoteControlAdapter};
use std::sync::Arc;

const TRACK_XML: &str = concat!(
    r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">"#,
    r#"<item id="42"><dc:title>Blue in Green</dc:title><upnp:artist>Miles Davis</upnp:artist>"#,
    r#"<upnp:album>Kind of Blue</upnp:album><upnp:duration>0:05:37</upnp:duration>"#,
    r#"<res protocolInfo="http-get:*:audio/flac:*">http://nas/blue.flac</res></item></DIDL-Lite>"#
);

struct Renderer {
    engine: Arc<NullAudioEngine>,
    player: Arc<Player>,
    metadata: Arc<MetadataStore>,
    adapter: Arc<RemoteControlAdapter>,
    notifications: Arc<EventCollector<Notification>>,
}

fn renderer(auto_status: bool) -> Renderer {
    let engine = Arc::new(NullAudioEngine::new().with_auto_status(auto_status));
    let player = Player::new(engine.clone());
    let metadata = Arc::new(MetadataStore::new());
    let adapter = RemoteControlAdapter::new(player.clone(), metadata.clone());
    adapter.attach();
    let notifications: Arc<EventCollector<Notification>> = EventCollector::new();
    adapter.register_listener(notifications.clone());
    Renderer {
        engine,
        player,
        metadata,
        adapter,
        notifications,
    }
}

#[test]
fn test_set_uri_reports_transitioning_then_playing() {
    let r = renderer(false);

    assert_eq!(r.adapter.handle_request("SetAVTransportURI", "http://nas/blue.flac"), "");
    assert_eq!(r.player.source().source_type, SourceType::RemoteControl);
    assert_eq!(r.engine.current_url().as_deref(), Some("http://nas/blue.flac"));
    assert_eq!(r.adapter.handle_request("GetTransportState", ""), "TRANSITIONING");
    assert_eq!(r.adapter.handle_request("GetTrackURI", ""), "http://nas/blue.flac");

    r.engine.emit(EngineEvent::Status(EngineStatus::Running));
    assert_eq!(r.player.state(), PlaybackState::Playing);
    assert_eq!(r.adapter.handle_request("GetTransportState", ""), "PLAYING");

    // One transport-state notification per state event
    assert_eq!(
        r.notifications.events(),
        vec![
            Notification::AvTransport("TransportState"),
            Notification::AvTransport("TransportState"),
        ]
    );
}

#[test]
fn test_pause_resume_and_stop() {
    let r = renderer(true);
    r.adapter.handle_request("SetAVTransportURI", "http://nas/blue.flac");
    r.engine.clear_calls();

    r.adapter.handle_request("Pause", "");
    assert_eq!(r.adapter.handle_request("GetTransportState", ""), "PAUSED_PLAYBACK");

    r.adapter.handle_request("Play", "");
    assert_eq!(r.adapter.handle_request("GetTransportState", ""), "PLAYING");

    r.adapter.handle_request("Next", "");
    assert_eq!(r.adapter.handle_request("GetTransportState", ""), "STOPPED");

    let calls = r.engine.calls();
    assert_eq!(calls[0], EngineCall::Pause);
    assert_eq!(calls[1], EngineCall::Resume);
    assert!(matches!(calls[2], EngineCall::Stop(_)));
}

#[test]
fn test_remote_metadata_is_cached_but_not_stored() {
    let r = renderer(true);
    r.adapter.handle_request("SetAVTransportURI", "http://nas/blue.flac");
    r.adapter.handle_request("SetAVTransportURIMetaData", TRACK_XML);

    assert!(r.metadata.get().is_empty());
    let reply = r.adapter.handle_request("GetTrackMetadata", "");
    assert!(reply.starts_with("&lt;DIDL-Lite"));
    assert!(reply.contains("&lt;dc:title&gt;Blue in Green&lt;/dc:title&gt;"));
    assert!(!reply.contains('<'));
}

#[test]
fn test_metadata_from_other_source_is_stored_and_served() {
    let r = renderer(true);
    r.player.set_source(MediaSource::internet_radio("http://radio/jazz"));
    r.adapter.handle_request("SetAVTransportURIMetaData", TRACK_XML);

    let stored = r.metadata.get();
    assert_eq!(stored.title.as_deref(), Some("Blue in Green"));
    assert_eq!(stored.artist.as_deref(), Some("Miles Davis"));
    assert_eq!(stored.duration, 337);

    // Engine knows no duration yet, so the metadata value is reported
    assert_eq!(r.adapter.handle_request("GetTrackDuration", ""), "00:05:37");
    r.engine.set_duration_ms(61_000);
    assert_eq!(r.adapter.handle_request("GetTrackDuration", ""), "00:01:01");
}

#[test]
fn test_local_track_metadata_is_served_as_didl() {
    let r = renderer(true);
    r.player.set_source(MediaSource::local_storage("/sdcard/a & b.mp3"));
    r.metadata.set_track(Some("a & b.mp3"), Some("SD Card"), None, 0, Some("/sdcard/a & b.mp3"), None);

    let reply = r.adapter.handle_request("GetTrackMetadata", "");
    // Element text is escaped once for XML and once more for the SOAP body
    assert!(reply.contains("&lt;dc:title&gt;a &amp;amp; b.mp3&lt;/dc:title&gt;"));
    assert!(reply.contains("&lt;upnp:album&gt;SD Card&lt;/upnp:album&gt;"));
}

#[test]
fn test_volume_and_mute_session() {
    let r = renderer(true);

    r.adapter.handle_request("SetVolume", "35");
    assert_eq!(r.adapter.handle_request("GetVolume", ""), "35");
    assert_eq!(r.adapter.handle_request("GetMute", ""), "0");

    r.adapter.handle_request("SetMute", "1");
    assert_eq!(r.adapter.handle_request("GetMute", ""), "1");
    assert_eq!(r.adapter.handle_request("GetVolume", ""), "0");

    r.adapter.handle_request("SetMute", "0");
    assert_eq!(r.adapter.handle_request("GetMute", ""), "0");
    assert_eq!(r.adapter.handle_request("GetVolume", ""), "35");

    // Out of range values are clamped by the player
    r.adapter.handle_request("SetVolume", "250");
    assert_eq!(r.adapter.handle_request("GetVolume", ""), "100");

    assert!(r
        .notifications
        .events()
        .iter()
        .all(|n| *n == Notification::RenderingControl));
    assert!(r.notifications.len() >= 6);
}

#[test]
fn test_seek_and_position_queries() {
    let r = renderer(true);
    r.adapter.handle_request("SetAVTransportURI", "http://nas/blue.flac");
    r.notifications.clear();
    r.engine.clear_calls();

    r.adapter.handle_request("Seek", "0:01:30");
    assert_eq!(r.engine.calls(), vec![EngineCall::Seek(90)]);
    assert_eq!(
        r.notifications.events(),
        vec![
            Notification::AvTransport("RelativeTimePosition"),
            Notification::AvTransport("RelativeCounterPosition"),
        ]
    );
    assert_eq!(r.adapter.handle_request("GetPosRelTime", ""), "00:01:30");

    r.engine.set_time_ms(3_723_000);
    r.engine.set_position(1_048_576);
    assert_eq!(r.adapter.handle_request("GetPosAbsTime", ""), "01:02:03");
    assert_eq!(r.adapter.handle_request("GetPosRelCount", ""), "1048576");

    // Malformed seek target is ignored
    r.engine.clear_calls();
    r.adapter.handle_request("Seek", "later");
    assert!(r.engine.calls().is_empty());
}

#[test]
fn test_icy_title_bypasses_metadata_store() {
    let r = renderer(true);
    let events: Arc<EventCollector<netplayer::PlayerEvent>> = EventCollector::new();
    r.player.register_listener(events.clone());
    r.metadata.set_track(Some("Jazz FM"), Some("Jazz FM"), None, 0, None, None);

    r.engine.emit(EngineEvent::IcyMetadata("StreamTitle='Chet Baker - Alone Together';".to_string()));

    assert_eq!(r.metadata.get().title.as_deref(), Some("Jazz FM"));
    assert!(events.events().iter().any(|e| matches!(
        e,
        netplayer::PlayerEvent::IcyMetadata { metadata } if metadata.title.as_deref() == Some("Chet Baker - Alone Together")
    )));
    assert!(r.notifications.events().is_empty());
}
