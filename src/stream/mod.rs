// Camera-style multipart image streams
pub mod frame;
pub mod multipart;
pub mod reader;

pub use frame::{DecodeError, Frame, FrameDecoder, ImageFrameDecoder};
pub use multipart::{boundary_from_content_type, MultipartItem, MultipartReader, Part, ReconnectReason};
pub use reader::{MjpegStreamReader, StreamConfig, StreamEvent, StreamState};

use crate::helpers::http_client::HttpClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream reader already running")]
    AlreadyRunning,

    #[error("HTTP error: {0}")]
    Http(#[from] HttpClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed multipart stream: {0}")]
    Protocol(String),

    #[error("Cannot start stream task: {0}")]
    Spawn(String),
}
