/// Media source descriptor: where the audio currently comes from
use serde::{Serialize, Deserialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceType {
    /// Nothing selected
    #[default]
    None,
    /// URL pushed by a DLNA control point
    RemoteControl,
    /// Station picked from the internet radio directory
    InternetRadio,
    /// File on the local storage card
    LocalStorage,
    /// Anything else (e.g. a URL typed on the console)
    Other,
}

/// A tagged source plus its URL.
///
/// The Player owns exactly one of these. It is replaced wholesale on every
/// `set_source`, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MediaSource {
    #[serde(rename = "type")]
    pub source_type: SourceType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MediaSource {
    pub fn new(source_type: SourceType, url: impl Into<String>) -> Self {
        Self {
            source_type,
            url: Some(url.into()),
        }
    }

    /// The empty source the Player starts with
    pub fn none() -> Self {
        Self::default()
    }

    pub fn remote_control(url: impl Into<String>) -> Self {
        Self::new(SourceType::RemoteControl, url)
    }

    pub fn internet_radio(url: impl Into<String>) -> Self {
        Self::new(SourceType::InternetRadio, url)
    }

    pub fn local_storage(url: impl Into<String>) -> Self {
        Self::new(SourceType::LocalStorage, url)
    }

    pub fn is_remote_control(&self) -> bool {
        self.source_type == SourceType::RemoteControl
    }

    /// Returns the URL only when it is set and not empty
    pub fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

impl std::fmt::Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{} ({})", self.source_type, url),
            None => write!(f, "{}", self.source_type),
        }
    }
}
