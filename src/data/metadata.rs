/// The "now playing" record shown on screen and served to control points
use std::fmt;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Album, or the creator/station name for sources without albums
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    /// Track length in whole seconds, 0 when unknown
    #[serde(default)]
    pub duration: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub art_url: Option<String>,

    // DLNA queue item fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upnp_class: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    // Internet radio fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Metadata {
    /// Build a record from the six basic fields. Empty strings are stored as `None`.
    pub fn from_fields(
        title: Option<&str>,
        album: Option<&str>,
        artist: Option<&str>,
        duration: u32,
        stream_url: Option<&str>,
        art_url: Option<&str>,
    ) -> Self {
        Metadata {
            title: non_empty(title),
            album: non_empty(album),
            artist: non_empty(artist),
            duration,
            stream_url: non_empty(stream_url),
            art_url: non_empty(art_url),
            ..Default::default()
        }
    }

    /// A record carrying only a title, as produced by inline ICY tags
    pub fn with_title(title: impl Into<String>) -> Self {
        Metadata {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display_str = self.title.as_deref().unwrap_or("Unknown Title").to_string();
        if let Some(artist_name) = &self.artist {
            if !artist_name.is_empty() {
                display_str.push_str(" by ");
                display_str.push_str(artist_name);
            }
        }
        if let Some(album_name) = &self.album {
            display_str.push_str(&format!(" (Album: {})", album_name));
        }
        write!(f, "{}", display_str)
    }
}
