//! Bridge between the synthesizer capability and the session.
//!
//! Playback follows cancel-then-play: a new `speak` always cancels whatever
//! is in flight, never queues behind it. A generation counter guards the
//! `speaking` flag so that a superseded utterance's completion cannot clear
//! the flag its successor just set: a burst of overlapping requests yields
//! exactly one final `speaking=false` transition.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::config::VoiceSettings;
use crate::core::state::{StateAggregator, StatePatch};
use crate::core::synthesis::base::{SpeechParams, Synthesizer};
use crate::errors::{SessionError, SessionResult};

/// Session-side owner of synthesis playback.
pub struct SynthesisBridge {
    synthesizer: Arc<dyn Synthesizer>,
    aggregator: Arc<StateAggregator>,
    settings: VoiceSettings,
    /// Bumped by every `speak` and `stop`; completions compare against it to
    /// decide whether they still own the `speaking` flag.
    generation: AtomicU64,
}

impl SynthesisBridge {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        aggregator: Arc<StateAggregator>,
        settings: VoiceSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            synthesizer,
            aggregator,
            settings,
            generation: AtomicU64::new(0),
        })
    }

    /// Speak `text`, cancelling any in-flight utterance first. Resolves when
    /// playback ends; fails with `VOICE_ERROR` on synthesis failure. This is
    /// the one session operation whose future carries the error to its
    /// caller; the failure is additionally recorded on the error channel.
    pub async fn speak(&self, text: &str) -> SessionResult<()> {
        if !self.settings.enabled {
            debug!("voice disabled, skipping synthesis");
            return Ok(());
        }
        if self.aggregator.is_destroyed() {
            return Ok(());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Cancel-then-play: the new request always wins.
        self.synthesizer.cancel_all();
        self.aggregator.update(StatePatch::new().speaking(true));

        let params = SpeechParams {
            language: self.settings.language.clone(),
            voice: self.settings.preferred_voice.clone(),
            rate: self.settings.rate,
            pitch: self.settings.pitch,
        };

        let result = self.synthesizer.speak(text, &params).await;

        // Only the newest utterance may clear the flag; a superseded one
        // would otherwise stomp on its successor's `speaking=true`.
        if self.generation.load(Ordering::SeqCst) == generation {
            self.aggregator.update(StatePatch::new().speaking(false));
        }

        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                let error = SessionError::VoiceError(error.message().to_string());
                warn!(error = %error, "synthesis failed");
                self.aggregator.report_error(&error);
                Err(error)
            }
        }
    }

    /// Cancel playback immediately and clear `speaking`. No-op when nothing
    /// is playing.
    pub fn stop(&self) {
        if !self.aggregator.snapshot().speaking {
            return;
        }
        // Take ownership of the flag away from any in-flight completion.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.synthesizer.cancel_all();
        self.aggregator.update(StatePatch::new().speaking(false));
    }
}
