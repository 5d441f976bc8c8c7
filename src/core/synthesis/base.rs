//! Base trait and types for the speech synthesis capability.

use async_trait::async_trait;

use crate::errors::SessionResult;

/// Voice parameters applied to one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    /// Language tag, e.g. "en-US".
    pub language: String,
    /// Preferred voice, if the platform offers a choice.
    pub voice: Option<String>,
    /// Playback rate multiplier (1.0 = normal).
    pub rate: f32,
    /// Playback pitch multiplier (1.0 = normal).
    pub pitch: f32,
}

/// The text-to-speech playback capability.
///
/// Contract notes:
/// - `speak` resolves when playback ends and fails on synthesis failure.
/// - a `cancel_all` racing an in-flight `speak` makes that `speak` resolve
///   (an aborted utterance counts as ended, not failed).
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize and play `text`, resolving at playback end.
    async fn speak(&self, text: &str, params: &SpeechParams) -> SessionResult<()>;

    /// Abort any in-flight utterance immediately. Idempotent.
    fn cancel_all(&self);
}
