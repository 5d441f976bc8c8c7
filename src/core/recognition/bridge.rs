//! Bridge between the recognizer capability and the session.
//!
//! Runs the recognizer in continuous interim-results mode, folds each result
//! event's segments into one transcript string, and forwards non-empty
//! transcripts to the aggregator (state snapshot + transcript subscribers).
//! Recognizer permission faults map to the same `MICROPHONE_DENIED` error as
//! capture-device denial: one underlying cause, one code.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::core::recognition::base::{
    RecognitionEvent, Recognizer, RecognizerFault, RecognizerOptions,
};
use crate::core::state::{StateAggregator, StatePatch};
use crate::errors::{SessionError, SessionResult};

/// Session-side owner of the recognition run. Its lifetime is tied to the
/// capture pipeline: started right after the track is published, stopped
/// during capture teardown.
pub struct RecognitionBridge {
    recognizer: Arc<dyn Recognizer>,
    aggregator: Arc<StateAggregator>,
    running: AtomicBool,
}

impl RecognitionBridge {
    pub fn new(recognizer: Arc<dyn Recognizer>, aggregator: Arc<StateAggregator>) -> Arc<Self> {
        Arc::new(Self {
            recognizer,
            aggregator,
            running: AtomicBool::new(false),
        })
    }

    /// Start continuous recognition in `language`. No-op when already
    /// running.
    pub async fn start(&self, language: &str) -> SessionResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("recognition already running");
            return Ok(());
        }

        let aggregator = self.aggregator.clone();
        let callback = Arc::new(move |event: RecognitionEvent| {
            if aggregator.is_destroyed() {
                return;
            }
            match event {
                RecognitionEvent::Results(segments) => {
                    let transcript: String =
                        segments.iter().map(|segment| segment.text.as_str()).collect();
                    if !transcript.is_empty() {
                        aggregator.forward_transcript(&transcript);
                    }
                }
                RecognitionEvent::Fault(fault) => {
                    let error = match fault {
                        RecognizerFault::PermissionDenied(message) => {
                            SessionError::MicrophoneDenied(message)
                        }
                        RecognizerFault::Other(message) => SessionError::VoiceError(message),
                    };
                    warn!(code = %error.code(), "recognizer fault");
                    aggregator.report_error(&error);
                }
            }
        });

        let options = RecognizerOptions {
            language: language.to_string(),
            continuous: true,
            interim_results: true,
        };

        if let Err(error) = self.recognizer.start(options, callback).await {
            self.running.store(false, Ordering::SeqCst);
            return Err(error);
        }

        self.aggregator.update(StatePatch::new().listening(true));
        Ok(())
    }

    /// Stop recognition. No-op when not running.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.recognizer.stop().await;
        self.aggregator.update(StatePatch::new().listening(false));
    }

    /// Whether a recognition run is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
