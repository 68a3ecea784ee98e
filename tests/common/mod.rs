// Common helpers for integration tests
#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use netplayer::helpers::{HttpClient, HttpClientError, HttpStream};
use netplayer::players::EventListener;
use std::collections::HashMap;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub use serial_test::serial;

/// Records every event it receives
pub struct EventCollector<E> {
    events: Mutex<Vec<E>>,
}

impl<E: Clone + Send> EventCollector<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()) })
    }

    pub fn events(&self) -> Vec<E> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Wait until an event matching the predicate has arrived
    pub fn wait_for<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&E) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.events.lock().unwrap().iter().any(&predicate) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl<E: Clone + Send> EventListener<E> for EventCollector<E> {
    fn on_event(&self, event: &E) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// In-memory HTTP client answering from a URL → body table
#[derive(Debug, Default, Clone)]
pub struct FakeHttp {
    responses: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses.lock().unwrap().insert(url.to_string(), body.into());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<Vec<u8>, HttpClientError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| HttpClientError::ServerError(format!("HTTP 404 {}", url)))
    }
}

impl HttpClient for FakeHttp {
    fn get(&self, url: &str) -> Result<String, HttpClientError> {
        let body = self.lookup(url)?;
        String::from_utf8(body).map_err(|e| HttpClientError::ParseError(e.to_string()))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpClientError> {
        self.lookup(url)
    }

    fn open_stream(&self, url: &str) -> Result<HttpStream, HttpClientError> {
        let body = self.lookup(url)?;
        Ok(HttpStream {
            content_type: Some("multipart/x-mixed-replace; boundary=frame".to_string()),
            reader: Box::new(Cursor::new(body)),
        })
    }

    fn clone_box(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}

/// Body of one multipart part, delimiter and headers included
pub fn multipart_part(boundary: &str, data: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "--{}\r\nContent-Type: image/png\r\nContent-Length: {}\r\n\r\n",
        boundary,
        data.len()
    )
    .into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

/// Loopback HTTP server answering every request with a multipart stream
///
/// With `repeat` the parts are sent over and over until the server is dropped
/// or the client disconnects; otherwise the connection is closed after the
/// last part. After `max_connections` accepted connections the listening
/// socket is closed, so further connects are refused.
pub struct MultipartServer {
    pub url: String,
    connections: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl MultipartServer {
    pub fn start(parts: Vec<Vec<u8>>, repeat: bool, max_connections: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/stream", listener.local_addr().unwrap());
        listener.set_nonblocking(true).unwrap();

        let connections = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));
        let accepted = connections.clone();
        let stop = shutdown.clone();

        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let count = accepted.fetch_add(1, Ordering::SeqCst) + 1;
                        let parts = parts.clone();
                        let stop = stop.clone();
                        thread::spawn(move || serve(stream, parts, repeat, stop));
                        if count >= max_connections {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(Duration::from_millis(5)),
                    Err(_) => break,
                }
            }
        });

        Self { url, connections, shutdown }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MultipartServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn serve(mut stream: TcpStream, parts: Vec<Vec<u8>>, repeat: bool, stop: Arc<AtomicBool>) {
    let _ = stream.set_nonblocking(false);

    // Consume the request head
    let mut request = Vec::new();
    let mut buf = [0u8; 512];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") && request.len() < 8192 {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let head = "HTTP/1.1 200 OK\r\n\
                Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
                Connection: close\r\n\r\n";
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }

    loop {
        for part in &parts {
            if stop.load(Ordering::SeqCst) || stream.write_all(part).is_err() {
                return;
            }
            let _ = stream.flush();
            if repeat {
                thread::sleep(Duration::from_millis(20));
            }
        }
        if !repeat {
            break;
        }
    }
    let _ = stream.shutdown(std::net::Shutdown::Both);
}
