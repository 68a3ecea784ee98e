//! TuneIn internet radio directory: favourites list and stream URL lookup
use crate::data::RadioStation;
use crate::helpers::http_client::{HttpClient, HttpClientError};
use serde::{Serialize, Deserialize};
use std::sync::Arc;
use log::{debug, info, warn};
use thiserror::Error;

pub const DEFAULT_FAVORITES_URL: &str = "https://api.tunein.com/profiles/me/follows?folderId=f1&filter=favorites&serial=9a451e82-6daf-48cf-abdc-9192fda47a63&partnerId=RadioTime";
pub const DEFAULT_TUNE_URL: &str = "https://opml.radiotime.com/Tune.ashx?id=";

#[derive(Debug, Error)]
pub enum TuneInError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpClientError),

    #[error("Cannot parse favourites: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Empty playlist for station {0}")]
    EmptyPlaylist(String),
}

/// TuneIn endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneInConfig {
    pub favorites_url: String,
    /// Prefix the guide id is appended to
    pub tune_url: String,
    /// Rewrite `https://` stream URLs to `http://`
    pub downgrade_https: bool,
}

impl Default for TuneInConfig {
    fn default() -> Self {
        Self {
            favorites_url: DEFAULT_FAVORITES_URL.to_string(),
            tune_url: DEFAULT_TUNE_URL.to_string(),
            downgrade_https: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FavoritesResponse {
    #[serde(rename = "Header", default)]
    header: Option<FavoritesHeader>,
    #[serde(rename = "Items", default)]
    items: Vec<FavoriteItem>,
}

#[derive(Debug, Deserialize)]
struct FavoritesHeader {
    #[serde(rename = "Title")]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FavoriteItem {
    #[serde(rename = "GuideId")]
    guide_id: Option<String>,
    #[serde(rename = "Image")]
    image: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Subtitle")]
    subtitle: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
}

pub struct TuneInClient {
    http: Arc<dyn HttpClient>,
    config: TuneInConfig,
}

impl TuneInClient {
    pub fn new(http: Arc<dyn HttpClient>, config: TuneInConfig) -> Self {
        Self { http, config }
    }

    /// Fetch the favourites folder
    pub fn favorites(&self) -> Result<Vec<RadioStation>, TuneInError> {
        let body = self.http.get(&self.config.favorites_url)?;
        let stations = parse_favorites(&body)?;
        info!("Loaded {} TuneIn favourites", stations.len());
        Ok(stations)
    }

    /// Look up the playable stream URL of a station, unless it already has one
    pub fn resolve_stream_url(&self, station: &mut RadioStation) -> Result<(), TuneInError> {
        if station.stream_url.is_some() {
            debug!("Radio station stream url already set");
            return Ok(());
        }

        let url = format!("{}{}", self.config.tune_url, urlencoding::encode(&station.guide_id));
        let playlist = self.http.get(&url)?;
        let mut stream_url = first_playlist_line(&playlist)
            .ok_or_else(|| TuneInError::EmptyPlaylist(station.guide_id.clone()))?
            .to_string();

        if self.config.downgrade_https {
            if let Some(rest) = stream_url.strip_prefix("https://") {
                stream_url = format!("http://{}", rest);
            }
        }

        info!("Stream URL of {}: [{}]", station.guide_id, stream_url);
        station.stream_url = Some(stream_url);
        Ok(())
    }
}

/// Parse the favourites JSON; entries without a guide id are dropped
pub fn parse_favorites(body: &str) -> Result<Vec<RadioStation>, serde_json::Error> {
    let response: FavoritesResponse = serde_json::from_str(body)?;
    if let Some(title) = response.header.and_then(|h| h.title) {
        debug!("TuneIn folder name: {}", title);
    }

    let stations = response
        .items
        .into_iter()
        .filter_map(|item| {
            let Some(guide_id) = item.guide_id.filter(|id| !id.is_empty()) else {
                warn!("Skipping favourite without GuideId: {:?}", item.title);
                return None;
            };
            Some(RadioStation {
                guide_id,
                title: item.title,
                subtitle: item.subtitle,
                description: item.description,
                image_url: item.image,
                stream_url: None,
            })
        })
        .collect();
    Ok(stations)
}

/// First line of an M3U body, `None` if it is empty
fn first_playlist_line(body: &str) -> Option<&str> {
    let line = body.split(|c| c == '\r' || c == '\n').next().unwrap_or("").trim();
    (!line.is_empty()).then_some(line)
}
