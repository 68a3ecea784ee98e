use crate::helpers::http_client::{HttpClient, HttpClientError};
use crate::stream::frame::{DecodeError, Frame, FrameDecoder};
use std::sync::Arc;
use log::{debug, info};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("Invalid artwork URL '{0}'")]
    InvalidUrl(String),

    #[error("Cannot read artwork file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot download artwork: {0}")]
    Http(#[from] HttpClientError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Loads album art and station logos and decodes them for the display
pub struct ArtworkLoader {
    http: Arc<dyn HttpClient>,
    decoder: Arc<dyn FrameDecoder>,
}

impl ArtworkLoader {
    pub fn new(http: Arc<dyn HttpClient>, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self { http, decoder }
    }

    /// Fetch the raw image bytes; `file://` URLs come from local storage
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, ArtworkError> {
        if url.starts_with("file:") {
            let path = Url::parse(url)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| ArtworkError::InvalidUrl(url.to_string()))?;
            debug!("Reading artwork from {:?}", path);
            return Ok(std::fs::read(path)?);
        }
        debug!("Downloading artwork from {}", url);
        Ok(self.http.get_bytes(url)?)
    }

    pub fn load(&self, url: &str) -> Result<Frame, ArtworkError> {
        let bytes = self.fetch(url)?;
        let frame = self.decoder.decode(&bytes)?;
        info!("Artwork decoded, image width = {} height = {}", frame.width, frame.height);
        Ok(frame)
    }
}
