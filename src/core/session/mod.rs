//! The voice session: composition root and lifecycle owner.
//!
//! A [`VoiceSession`] wires the four injected platform capabilities into the
//! orchestration subsystems (credential provider, room binding, capture
//! pipeline, recognition and synthesis bridges, state aggregator) and owns
//! the one global cancellation point: [`VoiceSession::disconnect`].
//!
//! Asynchronous lifecycle methods never return errors. Failures are
//! normalized into the state snapshot's `last_error` and fanned out on the
//! error channel, so a voice failure can never take the embedding widget
//! down with it. The single deliberate asymmetry is [`VoiceSession::speak`],
//! which has a direct one-shot caller and therefore returns a `Result`.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::core::capture::{CaptureDevice, CapturePipeline};
use crate::core::credentials::CredentialProvider;
use crate::core::recognition::{RecognitionBridge, Recognizer};
use crate::core::room::{RoomBinding, TransportRoom};
use crate::core::state::{
    ErrorCallback, SessionState, StateAggregator, StateCallback, Subscription,
    TranscriptCallback,
};
use crate::core::synthesis::{SynthesisBridge, Synthesizer};
use crate::errors::SessionResult;

/// The four platform capabilities a session is built over. Production code
/// injects real integrations; tests inject in-memory fakes.
pub struct SessionCapabilities {
    pub room: Arc<dyn TransportRoom>,
    pub capture: Arc<dyn CaptureDevice>,
    pub recognizer: Arc<dyn Recognizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// One end-to-end voice interaction lifecycle, from construction to
/// disconnect.
pub struct VoiceSession {
    config: SessionConfig,
    aggregator: Arc<StateAggregator>,
    credentials: Arc<CredentialProvider>,
    room: Arc<RoomBinding>,
    capture: Arc<CapturePipeline>,
    synthesis: Arc<SynthesisBridge>,
    /// Serializes connect / start / stop / disconnect so teardown can never
    /// interleave with a half-finished start.
    lifecycle: Mutex<()>,
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VoiceSession {
    /// Build a session. This is the only synchronous failure point: config
    /// validation (`MISSING_TOKEN` for an empty provided credential, invalid
    /// URLs). The room event handler is wired here, before any connect
    /// attempt can begin.
    pub fn new(
        mut config: SessionConfig,
        capabilities: SessionCapabilities,
    ) -> SessionResult<Self> {
        config.validate()?;
        config.resolve_identity();

        let aggregator = StateAggregator::new();
        let credentials = CredentialProvider::new(&config)?;
        let room = RoomBinding::new(
            capabilities.room,
            aggregator.clone(),
            config.voice.autoplay,
        );
        let recognition = RecognitionBridge::new(capabilities.recognizer, aggregator.clone());
        let capture = CapturePipeline::new(
            capabilities.capture,
            room.clone(),
            recognition,
            aggregator.clone(),
            config.voice.language.clone(),
        );
        let synthesis = SynthesisBridge::new(
            capabilities.synthesizer,
            aggregator.clone(),
            config.voice.clone(),
        );

        info!(
            room = %config.room_name,
            participant = %config.participant_name,
            "voice session created"
        );

        Ok(Self {
            config,
            aggregator,
            credentials,
            room,
            capture,
            synthesis,
            lifecycle: Mutex::new(()),
        })
    }

    /// The configuration this session was built with (identity resolved).
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Acquire a credential and connect the transport room. On success a
    /// background refresh is scheduled for server-issued credentials.
    /// Failures surface on the error channel, never as a return value.
    pub async fn connect(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.aggregator.is_destroyed() {
            return;
        }

        let credential = match self.credentials.acquire().await {
            Ok(credential) => credential,
            Err(error) => {
                self.aggregator.report_error(&error);
                return;
            }
        };

        if let Err(error) = self.room.connect(&self.config.endpoint, credential.token()).await {
            self.aggregator.report_error(&error);
            return;
        }

        self.credentials
            .schedule_refresh(&credential, self.aggregator.clone());
    }

    /// Start microphone capture, metering, publishing, and recognition.
    /// No-op while already recording. Failures surface on the error channel.
    pub async fn start_recording(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.aggregator.is_destroyed() {
            return;
        }
        if let Err(error) = self.capture.start().await {
            self.aggregator.report_error(&error);
        }
    }

    /// Stop capture and everything hanging off it. No-op while not
    /// recording.
    pub async fn stop_recording(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.aggregator.is_destroyed() {
            return;
        }
        self.capture.stop().await;
    }

    /// Speak `text` through the synthesis bridge (cancel-then-play). The one
    /// lifecycle method whose future carries its error to the caller.
    pub async fn speak(&self, text: &str) -> SessionResult<()> {
        self.synthesis.speak(text).await
    }

    /// Cancel synthesis playback immediately. No-op when nothing plays.
    pub fn stop_speaking(&self) {
        self.synthesis.stop();
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.aggregator.snapshot()
    }

    /// Register a state-change subscriber.
    pub fn on_state_change(&self, callback: StateCallback) -> Subscription {
        self.aggregator.on_state_change(callback)
    }

    /// Register a transcript subscriber.
    pub fn on_transcript(&self, callback: TranscriptCallback) -> Subscription {
        self.aggregator.on_transcript(callback)
    }

    /// Register an error subscriber.
    pub fn on_error(&self, callback: ErrorCallback) -> Subscription {
        self.aggregator.on_error(callback)
    }

    /// The single global cancellation point. Tears every subsystem down in
    /// fixed reverse-of-acquisition order: refresh task, volume loop +
    /// capture (cascading into recognition), synthesis, room connection,
    /// then the subscriber registries. Afterwards the session is permanently
    /// destroyed: stray late callbacks are no-ops and the observable state
    /// equals the default. Idempotent: repeat calls return immediately.
    pub async fn disconnect(&self) {
        if self.aggregator.is_destroyed() {
            return;
        }
        let _guard = self.lifecycle.lock().await;
        if self.aggregator.is_destroyed() {
            return;
        }
        debug!("voice session disconnecting");

        self.credentials.stop_refresh().await;
        self.capture.stop().await;
        self.synthesis.stop();
        self.room.disconnect().await;
        self.aggregator.destroy();

        info!(room = %self.config.room_name, "voice session destroyed");
    }

    /// Whether `disconnect` has completed.
    pub fn is_destroyed(&self) -> bool {
        self.aggregator.is_destroyed()
    }
}
