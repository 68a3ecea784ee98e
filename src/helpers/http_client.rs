use std::fmt;
use std::io::Read;
use std::time::Duration;
use log::{debug, error};
use thiserror::Error;

/// Default upper bound for bodies read into memory (album art, playlists)
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 512 * 1024;

/// Error types that can occur when interacting with HTTP clients
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request error: {0}")]
    RequestError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Empty response from server")]
    EmptyResponse,

    #[error("Response larger than {0} bytes")]
    ResponseTooLarge(usize),
}

/// An open streaming response
pub struct HttpStream {
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    pub reader: Box<dyn Read + Send>,
}

impl fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStream")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// A trait for HTTP client implementations
/// This version avoids generic methods to enable dynamic dispatch
pub trait HttpClient: Send + Sync + fmt::Debug {
    /// Send a GET request and return the body as text
    fn get(&self, url: &str) -> Result<String, HttpClientError>;

    /// Send a GET request and return the raw body, bounded by the maximum
    /// response size
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpClientError>;

    /// Send a GET request and hand back the body as a reader, for responses
    /// that never end (camera streams)
    fn open_stream(&self, url: &str) -> Result<HttpStream, HttpClientError>;

    /// Clone the client as a boxed trait object
    fn clone_box(&self) -> Box<dyn HttpClient>;
}

impl Clone for Box<dyn HttpClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An HTTP client implementation using ureq
#[derive(Clone, Debug)]
pub struct UreqHttpClient {
    agent: ureq::Agent,
    max_response_size: usize,
}

impl UreqHttpClient {
    /// Create a new HTTP client with the specified timeout
    ///
    /// The timeout bounds connecting and every single read, not the whole
    /// body, so long-lived streams are not cut off.
    pub fn new(timeout_secs: u64) -> Self {
        Self::with_max_response_size(timeout_secs, DEFAULT_MAX_RESPONSE_SIZE)
    }

    pub fn with_max_response_size(timeout_secs: u64, max_response_size: usize) -> Self {
        let timeout = Duration::from_secs(timeout_secs);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self {
            agent,
            max_response_size,
        }
    }

    fn call(&self, url: &str) -> Result<ureq::Response, HttpClientError> {
        match self.agent.get(url).call() {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, resp)) => {
                error!("GET {} returned HTTP {}", url, code);
                Err(HttpClientError::ServerError(format!("HTTP {} {}", code, resp.status_text())))
            }
            Err(e) => {
                error!("GET request failed: {}", e);
                Err(HttpClientError::RequestError(e.to_string()))
            }
        }
    }
}

impl Default for UreqHttpClient {
    /// Default timeout (10 seconds)
    fn default() -> Self {
        Self::new(10)
    }
}

impl HttpClient for UreqHttpClient {
    fn get(&self, url: &str) -> Result<String, HttpClientError> {
        debug!("GET request to {}", url);
        let bytes = self.get_bytes(url)?;
        String::from_utf8(bytes).map_err(|e| {
            error!("Response body is not UTF-8: {}", e);
            HttpClientError::ParseError(format!("Response body is not UTF-8: {}", e))
        })
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpClientError> {
        debug!("GET (bytes) request to {}", url);
        let response = self.call(url)?;

        let mut body = Vec::new();
        let limit = self.max_response_size as u64 + 1;
        if let Err(e) = response.into_reader().take(limit).read_to_end(&mut body) {
            error!("Failed to read response body: {}", e);
            return Err(HttpClientError::ParseError(format!("Failed to read response body: {}", e)));
        }

        if body.len() > self.max_response_size {
            return Err(HttpClientError::ResponseTooLarge(self.max_response_size));
        }
        if body.is_empty() {
            return Err(HttpClientError::EmptyResponse);
        }
        Ok(body)
    }

    fn open_stream(&self, url: &str) -> Result<HttpStream, HttpClientError> {
        debug!("GET (stream) request to {}", url);
        let response = self.call(url)?;
        let content_type = response.header("Content-Type").map(str::to_string);
        Ok(HttpStream {
            content_type,
            reader: Box::new(response.into_reader()),
        })
    }

    fn clone_box(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}
