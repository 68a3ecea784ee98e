use crate::helpers::http_client::HttpClient;
use crate::players::listeners::EventListener;
use crate::stream::frame::{Frame, FrameDecoder};
use crate::stream::multipart::{boundary_from_content_type, MultipartItem, MultipartReader};
use crate::stream::StreamError;
use crossbeam::channel::{bounded, Receiver, Sender};
use serde::{Serialize, Deserialize};
use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use strum_macros::Display;
use log::{debug, error, info, warn};

/// Lifecycle of the stream task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StreamState {
    #[default]
    Closed,
    Opening,
    Open,
    /// The task ended because it could not (re)connect
    Error,
}

/// Events delivered to the stream listener, on the stream thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Open,
    Frame(Frame),
    Error(String),
    Close,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// `close()` waits until the task has exited
    pub synchronous_close: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { synchronous_close: true }
    }
}

struct Worker {
    generation: u64,
    cancel: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }
}

/// Stream state tagged with the session that last wrote it
#[derive(Debug, Default)]
struct SharedState {
    generation: u64,
    state: StreamState,
}

/// Background reader for `multipart/x-mixed-replace` JPEG streams
///
/// At most one stream runs at a time. `open` returns as soon as the task is
/// spawned; connection results, frames and the end of the stream are reported
/// as [`StreamEvent`]s.
///
/// A task stays in the worker slot until it is joined, also while it is being
/// closed, so `open` keeps answering `AlreadyRunning` until the old task is gone.
pub struct MjpegStreamReader {
    http: Arc<dyn HttpClient>,
    decoder: Arc<dyn FrameDecoder>,
    config: StreamConfig,
    state: Arc<RwLock<SharedState>>,
    worker: Mutex<Option<Worker>>,
}

impl MjpegStreamReader {
    pub fn new(http: Arc<dyn HttpClient>, decoder: Arc<dyn FrameDecoder>, config: StreamConfig) -> Self {
        Self {
            http,
            decoder,
            config,
            state: Arc::new(RwLock::new(SharedState::default())),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state.read().map(|s| s.state).unwrap_or(StreamState::Error)
    }

    pub fn is_running(&self) -> bool {
        match self.worker.lock() {
            Ok(worker) => worker.as_ref().is_some_and(|w| !w.handle.is_finished()),
            Err(_) => false,
        }
    }

    /// Start streaming from `url`
    pub fn open(&self, url: &str, listener: Arc<dyn EventListener<StreamEvent>>) -> Result<(), StreamError> {
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| StreamError::Spawn("worker lock poisoned".to_string()))?;

        if let Some(previous) = worker.take() {
            if !previous.handle.is_finished() {
                warn!("Stream reader already running");
                *worker = Some(previous);
                return Err(StreamError::AlreadyRunning);
            }
            if previous.handle.join().is_err() {
                warn!("Previous stream task panicked");
            }
        }

        info!("Opening stream {}", url);
        let generation = self.start_generation();

        let cancel = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded(1);
        let session = Session {
            url: url.to_string(),
            http: self.http.clone(),
            decoder: self.decoder.clone(),
            listener,
            cancel: cancel.clone(),
            state: self.state.clone(),
            generation,
        };

        let handle = thread::Builder::new()
            .name("mjpeg-stream".to_string())
            .spawn(move || session.run(done_tx))
            .map_err(|e| {
                error!("Cannot create stream task: {}", e);
                write_state(&self.state, generation, StreamState::Closed);
                StreamError::Spawn(e.to_string())
            })?;

        *worker = Some(Worker {
            generation,
            cancel,
            done_rx,
            handle,
        });
        Ok(())
    }

    /// Claim the shared state for a new session
    fn start_generation(&self) -> u64 {
        match self.state.write() {
            Ok(mut shared) => {
                shared.generation += 1;
                debug!("Stream state {} -> {} (session {})", shared.state, StreamState::Opening, shared.generation);
                shared.state = StreamState::Opening;
                shared.generation
            }
            Err(_) => {
                warn!("Failed to acquire write lock for stream state");
                0
            }
        }
    }

    /// Ask the task to stop
    ///
    /// With `synchronous_close` this returns only after the task has sent its
    /// `Close` event and exited. Called from the stream's own listener it can
    /// only signal.
    pub fn close(&self) {
        let (generation, done_rx, own_thread) = match self.worker.lock() {
            Ok(worker) => match worker.as_ref() {
                Some(worker) => {
                    worker.cancel.store(true, Ordering::SeqCst);
                    (
                        worker.generation,
                        worker.done_rx.clone(),
                        worker.thread_id() == thread::current().id(),
                    )
                }
                None => {
                    debug!("Stream reader not running");
                    return;
                }
            },
            Err(_) => {
                warn!("Failed to acquire stream worker lock");
                return;
            }
        };

        info!("Closing stream reader...");
        if !self.config.synchronous_close || own_thread {
            debug!("Stream close signalled");
            return;
        }

        if done_rx.recv().is_err() {
            debug!("Stream task exited without acknowledgement");
        }

        // An open that ran in the meantime may already have joined the task
        let finished = match self.worker.lock() {
            Ok(mut worker) => match worker.take() {
                Some(current) if current.generation == generation => Some(current),
                other => {
                    *worker = other;
                    None
                }
            },
            Err(_) => None,
        };
        if let Some(finished) = finished {
            if finished.handle.join().is_err() {
                warn!("Stream task panicked");
            }
        }
        info!("Stream reader closed");
    }
}

impl Drop for MjpegStreamReader {
    fn drop(&mut self) {
        if let Ok(worker) = self.worker.get_mut() {
            if let Some(worker) = worker.as_ref() {
                worker.cancel.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Set the state if `generation` still owns it
fn write_state(state: &RwLock<SharedState>, generation: u64, next: StreamState) {
    match state.write() {
        Ok(mut shared) if shared.generation == generation => {
            debug!("Stream state {} -> {}", shared.state, next);
            shared.state = next;
        }
        Ok(shared) => debug!(
            "Session {} ended after session {} took over, state left {}",
            generation, shared.generation, shared.state
        ),
        Err(_) => warn!("Failed to acquire write lock for stream state"),
    }
}

type PartReader = MultipartReader<BufReader<Box<dyn Read + Send>>>;

/// Everything the stream thread owns
struct Session {
    url: String,
    http: Arc<dyn HttpClient>,
    decoder: Arc<dyn FrameDecoder>,
    listener: Arc<dyn EventListener<StreamEvent>>,
    cancel: Arc<AtomicBool>,
    state: Arc<RwLock<SharedState>>,
    generation: u64,
}

impl Session {
    fn run(self, done_tx: Sender<()>) {
        self.stream();
        // The receiver is gone when nobody waits synchronously
        let _ = done_tx.send(());
        debug!("Stream task exiting");
    }

    fn stream(&self) {
        let mut parts = match self.connect() {
            Ok(parts) => parts,
            Err(e) => {
                self.fail(format!("Connection error: {}", e));
                return;
            }
        };

        write_state(&self.state, self.generation, StreamState::Open);
        self.listener.on_event(&StreamEvent::Open);

        while !self.cancel.load(Ordering::SeqCst) {
            let reason = match parts.next_part() {
                Ok(MultipartItem::Part(part)) => {
                    self.frame(&part.data);
                    continue;
                }
                Ok(MultipartItem::Reconnect(reason)) => format!("{:?}", reason),
                Ok(MultipartItem::End) => "closing boundary".to_string(),
                Err(e) => e.to_string(),
            };

            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            warn!("Stream interrupted ({}) => Reconnecting...", reason);
            parts = match self.connect() {
                Ok(parts) => parts,
                Err(e) => {
                    self.fail(format!("Reconnection error: {}", e));
                    return;
                }
            };
        }

        write_state(&self.state, self.generation, StreamState::Closed);
        self.listener.on_event(&StreamEvent::Close);
    }

    fn connect(&self) -> Result<PartReader, StreamError> {
        debug!("Connecting to {}", self.url);
        let stream = self.http.open_stream(&self.url)?;
        let boundary = stream.content_type.as_deref().and_then(boundary_from_content_type);
        debug!("Stream content type {:?}, boundary {:?}", stream.content_type, boundary);
        Ok(MultipartReader::new(BufReader::new(stream.reader), boundary))
    }

    fn frame(&self, data: &[u8]) {
        match self.decoder.decode(data) {
            Ok(frame) => self.listener.on_event(&StreamEvent::Frame(frame)),
            Err(e) => warn!("Skipping frame of {} bytes: {}", data.len(), e),
        }
    }

    fn fail(&self, message: String) {
        error!("{}", message);
        write_state(&self.state, self.generation, StreamState::Error);
        self.listener.on_event(&StreamEvent::Error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::http_client::{HttpClientError, HttpStream};
    use crate::stream::frame::DecodeError;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Serves the same multipart body on every connect, up to a limit
    #[derive(Debug)]
    struct CannedStream {
        body: Vec<u8>,
        connects: AtomicUsize,
        max_connects: usize,
    }

    impl HttpClient for CannedStream {
        fn get(&self, _url: &str) -> Result<String, HttpClientError> {
            Err(HttpClientError::EmptyResponse)
        }

        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, HttpClientError> {
            Err(HttpClientError::EmptyResponse)
        }

        fn open_stream(&self, _url: &str) -> Result<HttpStream, HttpClientError> {
            let n = self.connects.fetch_add(1, Ordering::SeqCst);
            if n >= self.max_connects {
                return Err(HttpClientError::RequestError("connection refused".to_string()));
            }
            Ok(HttpStream {
                content_type: Some("multipart/x-mixed-replace;boundary=frame".to_string()),
                reader: Box::new(Cursor::new(self.body.clone())),
            })
        }

        fn clone_box(&self) -> Box<dyn HttpClient> {
            Box::new(CannedStream {
                body: self.body.clone(),
                connects: AtomicUsize::new(0),
                max_connects: self.max_connects,
            })
        }
    }

    /// Frame size taken from the first two payload bytes
    struct ByteDecoder;

    impl FrameDecoder for ByteDecoder {
        fn decode(&self, data: &[u8]) -> Result<Frame, DecodeError> {
            match data {
                [w, h, ..] => Ok(Frame {
                    width: u32::from(*w),
                    height: u32::from(*h),
                    pixels: Vec::new(),
                }),
                _ => Err(DecodeError::Empty),
            }
        }
    }

    /// Hands out its body one byte at a time, slowly
    struct TrickleReader {
        body: Cursor<Vec<u8>>,
        delay: Duration,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            thread::sleep(self.delay);
            let len = buf.len().min(1);
            self.body.read(&mut buf[..len])
        }
    }

    #[derive(Debug)]
    struct TrickleStream {
        body: Vec<u8>,
        delay: Duration,
        connects: Arc<AtomicUsize>,
    }

    impl HttpClient for TrickleStream {
        fn get(&self, _url: &str) -> Result<String, HttpClientError> {
            Err(HttpClientError::EmptyResponse)
        }

        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, HttpClientError> {
            Err(HttpClientError::EmptyResponse)
        }

        fn open_stream(&self, _url: &str) -> Result<HttpStream, HttpClientError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(HttpStream {
                content_type: Some("multipart/x-mixed-replace;boundary=frame".to_string()),
                reader: Box::new(TrickleReader {
                    body: Cursor::new(self.body.clone()),
                    delay: self.delay,
                }),
            })
        }

        fn clone_box(&self) -> Box<dyn HttpClient> {
            Box::new(TrickleStream {
                body: self.body.clone(),
                delay: self.delay,
                connects: self.connects.clone(),
            })
        }
    }

    fn body(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for payload in payloads {
            out.extend(format!("--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n", payload.len()).into_bytes());
            out.extend_from_slice(payload);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    fn reader(body: Vec<u8>, max_connects: usize, synchronous_close: bool) -> MjpegStreamReader {
        let http = Arc::new(CannedStream {
            body,
            connects: AtomicUsize::new(0),
            max_connects,
        });
        MjpegStreamReader::new(http, Arc::new(ByteDecoder), StreamConfig { synchronous_close })
    }

    fn collector() -> (Arc<Mutex<Vec<StreamEvent>>>, Arc<dyn EventListener<StreamEvent>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let listener: Arc<dyn EventListener<StreamEvent>> =
            Arc::new(move |event: &StreamEvent| sink.lock().unwrap().push(event.clone()));
        (events, listener)
    }

    fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_connect_failure_reports_error() {
        let stream = reader(Vec::new(), 0, true);
        let (events, listener) = collector();
        stream.open("http://camera", listener).unwrap();

        assert!(wait_for(|| stream.state() == StreamState::Error));
        assert!(wait_for(|| !stream.is_running()));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Error(msg) if msg.starts_with("Connection error")));
    }

    #[test]
    fn test_frames_then_reconnect_failure() {
        // Two connections worth of frames, the third connect fails
        let stream = reader(body(&[&[2, 3, 0xFF], b"x", &[4, 5]]), 2, true);
        let (events, listener) = collector();
        stream.open("http://camera", listener).unwrap();

        assert!(wait_for(|| stream.state() == StreamState::Error));
        let events = events.lock().unwrap();
        let frames: Vec<(u32, u32)> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Frame(f) => Some((f.width, f.height)),
                _ => None,
            })
            .collect();
        assert_eq!(events.first(), Some(&StreamEvent::Open));
        assert_eq!(frames, vec![(2, 3), (4, 5), (2, 3), (4, 5)]);
        assert!(matches!(events.last(), Some(StreamEvent::Error(msg)) if msg.starts_with("Reconnection error")));
        assert!(!events.contains(&StreamEvent::Close));
    }

    #[test]
    fn test_synchronous_close() {
        let stream = reader(body(&[&[1, 1]]), usize::MAX, true);
        let (events, listener) = collector();
        stream.open("http://camera", listener).unwrap();
        assert!(wait_for(|| stream.state() == StreamState::Open));

        stream.close();
        assert_eq!(stream.state(), StreamState::Closed);
        assert!(!stream.is_running());
        assert_eq!(events.lock().unwrap().last(), Some(&StreamEvent::Close));
    }

    #[test]
    fn test_second_open_rejected_while_running() {
        let stream = reader(body(&[&[1, 1]]), usize::MAX, true);
        let (_events, listener) = collector();
        stream.open("http://camera", listener.clone()).unwrap();
        assert!(matches!(stream.open("http://camera", listener.clone()), Err(StreamError::AlreadyRunning)));

        stream.close();
        stream.open("http://camera", listener).unwrap();
        stream.close();
    }

    #[test]
    fn test_signal_only_close() {
        let stream = reader(body(&[&[1, 1]]), usize::MAX, false);
        let (events, listener) = collector();
        stream.open("http://camera", listener).unwrap();
        stream.close();

        assert!(wait_for(|| stream.state() == StreamState::Closed));
        assert!(wait_for(|| !stream.is_running()));
        assert!(wait_for(|| events.lock().unwrap().last() == Some(&StreamEvent::Close)));
    }

    #[test]
    fn test_open_rejected_while_synchronous_close_waits() {
        let connects = Arc::new(AtomicUsize::new(0));
        let http = Arc::new(TrickleStream {
            body: body(&[&[1, 1]]),
            delay: Duration::from_millis(20),
            connects: connects.clone(),
        });
        let stream = Arc::new(MjpegStreamReader::new(http, Arc::new(ByteDecoder), StreamConfig::default()));
        let (events, listener) = collector();
        stream.open("http://camera", listener.clone()).unwrap();
        assert!(wait_for(|| stream.state() == StreamState::Open));

        let closer = {
            let stream = stream.clone();
            thread::spawn(move || stream.close())
        };
        thread::sleep(Duration::from_millis(50));
        // The first task is still in the middle of its part
        assert!(matches!(stream.open("http://camera", listener.clone()), Err(StreamError::AlreadyRunning)));
        assert!(stream.is_running());

        closer.join().unwrap();
        assert_eq!(stream.state(), StreamState::Closed);
        assert!(!stream.is_running());
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(events.lock().unwrap().last(), Some(&StreamEvent::Close));

        // Free again once the close has returned
        stream.open("http://camera", listener).unwrap();
        assert!(wait_for(|| stream.state() == StreamState::Open));
        stream.close();
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_close_from_own_listener() {
        let stream = Arc::new(reader(body(&[&[1, 1]]), usize::MAX, true));
        let (events, sink) = collector();
        let weak = Arc::downgrade(&stream);
        let listener: Arc<dyn EventListener<StreamEvent>> = Arc::new(move |event: &StreamEvent| {
            sink.on_event(event);
            if let (StreamEvent::Frame(_), Some(stream)) = (event, weak.upgrade()) {
                stream.close();
            }
        });
        stream.open("http://camera", listener).unwrap();

        assert!(wait_for(|| !stream.is_running()));
        assert_eq!(stream.state(), StreamState::Closed);
        let events = events.lock().unwrap();
        assert_eq!(events.last(), Some(&StreamEvent::Close));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error(_))));
    }

    #[test]
    fn test_stale_session_leaves_state_alone() {
        let state = RwLock::new(SharedState {
            generation: 2,
            state: StreamState::Open,
        });
        write_state(&state, 1, StreamState::Closed);
        assert_eq!(state.read().unwrap().state, StreamState::Open);
        write_state(&state, 2, StreamState::Error);
        assert_eq!(state.read().unwrap().state, StreamState::Error);
    }
}
