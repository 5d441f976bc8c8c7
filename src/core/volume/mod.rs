//! Live loudness metering.
//!
//! The [`VolumeMonitor`] runs a cancellable sampling task at animation-frame
//! cadence (~16 ms). Each tick reads the average frequency-domain energy from
//! the analyzer, converts it to a 0-100 level, and pushes it into the state
//! aggregator. Cancellation is checked at the top of every tick and again
//! before each push, so the loop never schedules work against a closed
//! analyzer or a torn-down session.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::capture::EnergyAnalyzer;
use crate::core::state::{StateAggregator, StatePatch};

/// One sample per animation tick.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(16);

/// Convert an average byte-scale energy (0-255) to a 0-100 level.
pub(crate) fn meter_level(avg_energy: f32) -> f32 {
    ((avg_energy / 128.0) * 100.0).clamp(0.0, 100.0)
}

/// Handle to a running sampling loop. Created by the capture pipeline when
/// capture starts; stopped when capture stops or the session tears down.
pub struct VolumeMonitor {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VolumeMonitor {
    /// Spawn the sampling loop over `analyzer`.
    pub fn start(analyzer: Arc<dyn EnergyAnalyzer>, aggregator: Arc<StateAggregator>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(SAMPLE_INTERVAL);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {}
                }
                // Re-check after waking: cancellation may have raced the tick.
                if token.is_cancelled() || aggregator.is_destroyed() {
                    break;
                }
                let level = meter_level(analyzer.average_energy());
                aggregator.update(StatePatch::new().volume(level));
            }
            debug!("volume sampling loop ended");
        });

        Self { cancel, task: Mutex::new(Some(task)) }
    }

    /// Cancel the loop and wait for it to finish. After this returns, no
    /// further tick will touch the analyzer or the aggregator. Idempotent.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct FakeAnalyzer {
        energy: AtomicU32,
        closed: AtomicBool,
        sampled_after_close: AtomicU32,
    }

    impl FakeAnalyzer {
        fn new(energy: f32) -> Arc<Self> {
            Arc::new(Self {
                energy: AtomicU32::new(energy.to_bits()),
                closed: AtomicBool::new(false),
                sampled_after_close: AtomicU32::new(0),
            })
        }
    }

    impl EnergyAnalyzer for FakeAnalyzer {
        fn average_energy(&self) -> f32 {
            if self.closed.load(Ordering::SeqCst) {
                self.sampled_after_close.fetch_add(1, Ordering::SeqCst);
                return 0.0;
            }
            f32::from_bits(self.energy.load(Ordering::SeqCst))
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_meter_level_scale() {
        assert_eq!(meter_level(0.0), 0.0);
        assert_eq!(meter_level(64.0), 50.0);
        assert_eq!(meter_level(128.0), 100.0);
        // Above full scale clamps.
        assert_eq!(meter_level(255.0), 100.0);
        assert_eq!(meter_level(-10.0), 0.0);
    }

    #[tokio::test]
    async fn test_monitor_pushes_clamped_volume() {
        let aggregator = StateAggregator::new();
        let analyzer = FakeAnalyzer::new(64.0);

        let monitor = VolumeMonitor::start(analyzer.clone(), aggregator.clone());
        tokio::time::sleep(Duration::from_millis(80)).await;
        monitor.stop().await;

        let volume = aggregator.snapshot().volume;
        assert!((volume - 50.0).abs() < f32::EPSILON, "volume was {volume}");
    }

    #[tokio::test]
    async fn test_no_tick_after_stop() {
        let aggregator = StateAggregator::new();
        let analyzer = FakeAnalyzer::new(10.0);

        let monitor = VolumeMonitor::start(analyzer.clone(), aggregator.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.stop().await;

        // Closing after stop must be safe: the loop is guaranteed finished,
        // so no sample can observe the closed analyzer.
        analyzer.close();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(analyzer.sampled_after_close.load(Ordering::SeqCst), 0);

        // Stop twice is fine.
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_loop_ends_when_session_destroyed() {
        let aggregator = StateAggregator::new();
        let analyzer = FakeAnalyzer::new(10.0);

        let monitor = VolumeMonitor::start(analyzer.clone(), aggregator.clone());
        aggregator.destroy();
        // Give any in-flight tick time to drain before closing the analyzer.
        tokio::time::sleep(Duration::from_millis(50)).await;

        analyzer.close();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(analyzer.sampled_after_close.load(Ordering::SeqCst), 0);
        monitor.stop().await;
    }
}
