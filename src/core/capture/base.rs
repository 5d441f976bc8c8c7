//! Base traits for the capture device capability.
//!
//! Three narrow seams: the device that grants (or denies) a stream, the
//! stream that owns the live tracks, and the analyzer that exposes
//! frequency-domain energy for the volume monitor. The capture pipeline is
//! the only consumer of all three.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::room::LocalAudioTrack;
use crate::errors::SessionResult;

/// Constraints for the capture stream request. All processing flags default
/// to on, which is what a conversational widget wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// The platform's microphone-access facility.
///
/// Denied access fails with `MICROPHONE_DENIED`; the implementation must not
/// leave partial device state allocated on failure.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request a capture stream honoring `constraints`.
    async fn request_stream(
        &self,
        constraints: CaptureConstraints,
    ) -> SessionResult<Box<dyn CaptureStream>>;
}

/// A live capture stream. Owns the underlying device tracks; the pipeline
/// releases them through `stop_tracks` exactly once.
pub trait CaptureStream: Send + Sync {
    /// The publishable audio track handle. The stream keeps ownership of the
    /// underlying device resource.
    fn audio_track(&self) -> LocalAudioTrack;

    /// Build the analysis graph over this stream's audio.
    fn build_analyzer(&self) -> SessionResult<Arc<dyn EnergyAnalyzer>>;

    /// Stop and release every device track. Idempotent.
    fn stop_tracks(&self);
}

/// Frequency-domain energy tap over a capture stream.
pub trait EnergyAnalyzer: Send + Sync {
    /// Average energy across the spectrum on a 0-255 byte scale.
    /// Returns 0.0 once closed.
    fn average_energy(&self) -> f32;

    /// Release the analysis graph. Idempotent.
    fn close(&self);
}
