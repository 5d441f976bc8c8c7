//! Capture pipeline: microphone acquisition, metering, publishing, and
//! recognition startup, with reverse-order teardown.
//!
//! Acquisition order on `start()`: device stream → analyzer → volume monitor
//! → publish to room → recognition. A failure at any step unwinds the steps
//! already taken, in reverse, so no partial resources remain allocated.
//! `stop()` runs the same reverse order over a fully-started pipeline. Both
//! calls are idempotent.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::capture::base::{CaptureConstraints, CaptureDevice, CaptureStream, EnergyAnalyzer};
use crate::core::recognition::RecognitionBridge;
use crate::core::room::{RoomBinding, TrackPublication};
use crate::core::state::{StateAggregator, StatePatch};
use crate::core::volume::VolumeMonitor;
use crate::errors::SessionResult;

/// Everything a running capture owns. Dropped field-by-field during `stop`.
struct ActiveCapture {
    stream: Box<dyn CaptureStream>,
    analyzer: Arc<dyn EnergyAnalyzer>,
    volume: VolumeMonitor,
    publication: TrackPublication,
}

/// Session-side owner of the device stream and its downstream consumers.
pub struct CapturePipeline {
    device: Arc<dyn CaptureDevice>,
    room: Arc<RoomBinding>,
    recognition: Arc<RecognitionBridge>,
    aggregator: Arc<StateAggregator>,
    language: String,
    active: Mutex<Option<ActiveCapture>>,
}

impl CapturePipeline {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        room: Arc<RoomBinding>,
        recognition: Arc<RecognitionBridge>,
        aggregator: Arc<StateAggregator>,
        language: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            device,
            room,
            recognition,
            aggregator,
            language,
            active: Mutex::new(None),
        })
    }

    /// Start capturing. No-op when already started; exactly one device
    /// stream is ever allocated at a time.
    pub async fn start(&self) -> SessionResult<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            debug!("capture already started");
            return Ok(());
        }

        // Device access first. Denial fails here with MICROPHONE_DENIED and
        // nothing has been allocated yet.
        let stream = self
            .device
            .request_stream(CaptureConstraints::default())
            .await?;

        let analyzer = match stream.build_analyzer() {
            Ok(analyzer) => analyzer,
            Err(error) => {
                stream.stop_tracks();
                return Err(error);
            }
        };

        let volume = VolumeMonitor::start(analyzer.clone(), self.aggregator.clone());

        let publication = match self.room.publish_track(stream.audio_track()).await {
            Ok(publication) => publication,
            Err(error) => {
                volume.stop().await;
                analyzer.close();
                stream.stop_tracks();
                self.aggregator.update(StatePatch::new().volume(0.0));
                return Err(error);
            }
        };

        // Recording must be visible before recognition flips `listening`;
        // the snapshot invariant drops `listening` while `recording` is
        // false.
        self.aggregator.update(StatePatch::new().recording(true));

        if let Err(error) = self.recognition.start(&self.language).await {
            if let Err(unpublish_error) = self.room.unpublish_track(publication).await {
                warn!(error = %unpublish_error, "failed to unpublish after recognition error");
            }
            volume.stop().await;
            analyzer.close();
            stream.stop_tracks();
            self.aggregator
                .update(StatePatch::new().recording(false).volume(0.0));
            return Err(error);
        }

        info!("capture started");

        *active = Some(ActiveCapture { stream, analyzer, volume, publication });
        Ok(())
    }

    /// Stop capturing, reversing every start step: volume monitor,
    /// recognition, unpublish, device tracks, analyzer. No-op when not
    /// started.
    pub async fn stop(&self) {
        let capture = self.active.lock().await.take();
        let Some(capture) = capture else {
            return;
        };

        capture.volume.stop().await;
        self.recognition.stop().await;

        if let Err(error) = self.room.unpublish_track(capture.publication).await {
            warn!(error = %error, "failed to unpublish capture track");
        }
        capture.stream.stop_tracks();
        capture.analyzer.close();

        self.aggregator
            .update(StatePatch::new().recording(false).listening(false).volume(0.0));
        info!("capture stopped");
    }

    /// Whether capture is currently running.
    pub async fn is_started(&self) -> bool {
        self.active.lock().await.is_some()
    }
}
