//! In-memory fake capabilities
//!
//! Scriptable implementations of the four platform seams the session is
//! built over:
//! - transport room (connect/publish/subscribe, event injection)
//! - capture device (grant or deny streams, live-stream accounting)
//! - recognizer (manual event injection)
//! - synthesizer (records utterances, optional hold-until-cancel playback)
//!
//! Failure modes are toggled per test: deny the microphone, refuse the
//! connection, fail publishing, fail synthesis.

// Allow dead code in test infrastructure - these utilities may be used by future tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use tokio::sync::Notify;

use voxsession::core::recognition::RecognitionCallback;
use voxsession::core::room::RoomEventCallback;
use voxsession::{
    CaptureConstraints, CaptureDevice, CaptureStream, EnergyAnalyzer, LocalAudioTrack,
    RecognitionEvent, Recognizer, RecognizerOptions, RoomEvent, SessionCapabilities, SessionError,
    SessionResult, SpeechParams, Synthesizer, TrackPublication, TransportRoom,
};

/// Install a test log subscriber honoring RUST_LOG. Safe to call repeatedly;
/// only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Transport Room
// =============================================================================

/// Fake transport room. Fires `Connected`/`Disconnected` events itself and
/// lets tests inject any other room event.
pub struct FakeRoom {
    handler: Mutex<Option<RoomEventCallback>>,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    fail_publish: AtomicBool,
    next_publication: AtomicU64,
    pub last_token: Mutex<Option<String>>,
    pub published: Mutex<Vec<LocalAudioTrack>>,
    pub unpublished: Mutex<Vec<TrackPublication>>,
    pub attached: Mutex<Vec<String>>,
    pub detached: Mutex<Vec<String>>,
    pub disconnect_calls: AtomicU64,
}

impl FakeRoom {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handler: Mutex::new(None),
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            next_publication: AtomicU64::new(1),
            last_token: Mutex::new(None),
            published: Mutex::new(Vec::new()),
            unpublished: Mutex::new(Vec::new()),
            attached: Mutex::new(Vec::new()),
            detached: Mutex::new(Vec::new()),
            disconnect_calls: AtomicU64::new(0),
        })
    }

    pub fn refuse_connections(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn refuse_publishing(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Deliver a room event to the registered handler, as the transport's
    /// event loop would.
    pub fn emit(&self, event: RoomEvent) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

#[async_trait]
impl TransportRoom for FakeRoom {
    fn set_event_handler(&self, callback: RoomEventCallback) {
        *self.handler.lock() = Some(callback);
    }

    async fn connect(&self, _url: &str, token: &str) -> SessionResult<()> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(SessionError::VoiceError("transport refused connection".into()));
        }
        *self.last_token.lock() = Some(token.to_string());
        self.connected.store(true, Ordering::SeqCst);
        self.emit(RoomEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.connected.swap(false, Ordering::SeqCst) {
            self.emit(RoomEvent::Disconnected { reason: None });
        }
    }

    async fn publish_track(&self, track: LocalAudioTrack) -> SessionResult<TrackPublication> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(SessionError::VoiceError("publish rejected".into()));
        }
        self.published.lock().push(track);
        let sid = self.next_publication.fetch_add(1, Ordering::SeqCst);
        Ok(TrackPublication { sid: format!("pub-{sid}") })
    }

    async fn unpublish_track(&self, publication: TrackPublication) -> SessionResult<()> {
        self.unpublished.lock().push(publication);
        Ok(())
    }

    fn attach_remote_track(&self, track_sid: &str) {
        self.attached.lock().push(track_sid.to_string());
    }

    fn detach_remote_track(&self, track_sid: &str) {
        self.detached.lock().push(track_sid.to_string());
    }
}

// =============================================================================
// Capture Device
// =============================================================================

/// Fake analyzer with settable energy (0-255 byte scale).
pub struct FakeAnalyzer {
    energy: Arc<AtomicU32>,
    closed: AtomicBool,
}

impl EnergyAnalyzer for FakeAnalyzer {
    fn average_energy(&self) -> f32 {
        if self.closed.load(Ordering::SeqCst) {
            return 0.0;
        }
        f32::from_bits(self.energy.load(Ordering::SeqCst))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeCaptureStream {
    id: u64,
    energy: Arc<AtomicU32>,
    live_streams: Arc<AtomicI64>,
    stopped: AtomicBool,
}

impl CaptureStream for FakeCaptureStream {
    fn audio_track(&self) -> LocalAudioTrack {
        LocalAudioTrack { id: format!("mic-{}", self.id) }
    }

    fn build_analyzer(&self) -> SessionResult<Arc<dyn EnergyAnalyzer>> {
        Ok(Arc::new(FakeAnalyzer {
            energy: self.energy.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    fn stop_tracks(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Fake microphone facility with permission control and live-stream
/// accounting for the double-acquire property.
pub struct FakeCaptureDevice {
    deny: AtomicBool,
    energy: Arc<AtomicU32>,
    live_streams: Arc<AtomicI64>,
    pub requests: AtomicU64,
}

impl FakeCaptureDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deny: AtomicBool::new(false),
            energy: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            live_streams: Arc::new(AtomicI64::new(0)),
            requests: AtomicU64::new(0),
        })
    }

    pub fn deny_access(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }

    /// Set the energy every analyzer built from this device reports.
    pub fn set_energy(&self, energy: f32) {
        self.energy.store(energy.to_bits(), Ordering::SeqCst);
    }

    /// Device streams currently allocated (acquired minus released).
    pub fn live_stream_count(&self) -> i64 {
        self.live_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for FakeCaptureDevice {
    async fn request_stream(
        &self,
        _constraints: CaptureConstraints,
    ) -> SessionResult<Box<dyn CaptureStream>> {
        let id = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.deny.load(Ordering::SeqCst) {
            return Err(SessionError::MicrophoneDenied("permission dismissed".into()));
        }
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCaptureStream {
            id,
            energy: self.energy.clone(),
            live_streams: self.live_streams.clone(),
            stopped: AtomicBool::new(false),
        }))
    }
}

// =============================================================================
// Recognizer
// =============================================================================

/// Fake recognizer: tests inject result and fault events manually.
pub struct FakeRecognizer {
    callback: Mutex<Option<RecognitionCallback>>,
    pub starts: AtomicU64,
    pub stops: AtomicU64,
}

impl FakeRecognizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            callback: Mutex::new(None),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        })
    }

    pub fn emit(&self, event: RecognitionEvent) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    pub fn is_running(&self) -> bool {
        self.callback.lock().is_some()
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn start(
        &self,
        _options: RecognizerOptions,
        callback: RecognitionCallback,
    ) -> SessionResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock() = Some(callback);
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock() = None;
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Fake synthesizer. By default playback completes immediately; with
/// `hold_playback` it runs until cancelled, which is what the cancel-then-play
/// tests need.
pub struct FakeSynthesizer {
    pub spoken: Mutex<Vec<String>>,
    cancelled: Arc<Notify>,
    fail: AtomicBool,
    hold: AtomicBool,
    pub cancel_calls: AtomicU64,
}

impl FakeSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            cancelled: Arc::new(Notify::new()),
            fail: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            cancel_calls: AtomicU64::new(0),
        })
    }

    pub fn fail_synthesis(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Make playback run until the next `cancel_all`.
    pub fn hold_playback(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// End any held playback, as the platform would at utterance end.
    pub fn finish_playback(&self) {
        self.cancelled.notify_waiters();
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn speak(&self, text: &str, _params: &SpeechParams) -> SessionResult<()> {
        self.spoken.lock().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::VoiceError("synthesis engine failed".into()));
        }
        if self.hold.load(Ordering::SeqCst) {
            self.cancelled.notified().await;
        }
        Ok(())
    }

    fn cancel_all(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_waiters();
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// All four fakes plus the capability bundle the session consumes.
pub struct FakeStack {
    pub room: Arc<FakeRoom>,
    pub device: Arc<FakeCaptureDevice>,
    pub recognizer: Arc<FakeRecognizer>,
    pub synthesizer: Arc<FakeSynthesizer>,
}

impl FakeStack {
    pub fn new() -> Self {
        init_tracing();
        Self {
            room: FakeRoom::new(),
            device: FakeCaptureDevice::new(),
            recognizer: FakeRecognizer::new(),
            synthesizer: FakeSynthesizer::new(),
        }
    }

    pub fn capabilities(&self) -> SessionCapabilities {
        SessionCapabilities {
            room: self.room.clone(),
            capture: self.device.clone(),
            recognizer: self.recognizer.clone(),
            synthesizer: self.synthesizer.clone(),
        }
    }
}
