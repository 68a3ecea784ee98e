use serde::{Serialize, Deserialize};
use crate::data::Metadata;

/// An entry of the internet radio directory favourites list
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RadioStation {
    pub guide_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Filled in lazily by resolving the station's playlist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

impl RadioStation {
    pub fn new(guide_id: impl Into<String>) -> Self {
        Self {
            guide_id: guide_id.into(),
            ..Default::default()
        }
    }

    /// Metadata shown while the station is playing. Radio has no album, so the
    /// station title is used for both title and album.
    pub fn to_metadata(&self) -> Metadata {
        Metadata {
            title: self.title.clone(),
            album: self.title.clone(),
            duration: 0,
            stream_url: self.stream_url.clone(),
            art_url: self.image_url.clone(),
            guide_id: Some(self.guide_id.clone()),
            subtitle: self.subtitle.clone(),
            description: self.description.clone(),
            ..Default::default()
        }
    }
}
