//! Base trait and types for the speech recognition capability.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::SessionResult;

/// Options for a recognition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerOptions {
    /// Language tag, e.g. "en-US".
    pub language: String,
    /// Keep recognizing across utterance boundaries.
    pub continuous: bool,
    /// Emit interim (non-final) hypotheses.
    pub interim_results: bool,
}

/// One hypothesis segment from the recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedSegment {
    /// Recognized text, carrying its own leading/trailing spacing.
    pub text: String,
    /// Whether this segment is final or may still be revised.
    pub is_final: bool,
}

/// Faults surfaced by the recognizer while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerFault {
    /// The platform denied microphone access to the recognizer.
    PermissionDenied(String),
    /// Any other recognizer failure.
    Other(String),
}

/// Events emitted by a running recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// All currently-available hypothesis segments since the last emission
    /// boundary, interim and final alike.
    Results(Vec<RecognizedSegment>),
    /// A runtime fault. The run may or may not continue afterwards.
    Fault(RecognizerFault),
}

/// Callback for recognition events.
pub type RecognitionCallback = Arc<dyn Fn(RecognitionEvent) + Send + Sync>;

/// The continuous speech-to-text capability.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Start a recognition run. Events flow through `callback` until `stop`.
    async fn start(
        &self,
        options: RecognizerOptions,
        callback: RecognitionCallback,
    ) -> SessionResult<()>;

    /// Stop the current run. No events are delivered after this returns.
    /// Idempotent.
    async fn stop(&self);
}
