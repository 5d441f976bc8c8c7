//! Session state aggregation and observer fan-out.
//!
//! The [`StateAggregator`] owns the single canonical [`SessionState`]
//! snapshot. Subsystems push partial updates ([`StatePatch`]) into it; every
//! update merges into the snapshot and synchronously notifies state
//! subscribers with the full new snapshot, never the delta. Transcript and
//! error notifications are separate channels with their own registries, fired
//! in addition to the state update.
//!
//! The aggregator lock is short-lived and never held across an await point;
//! callbacks run after the lock is released, still synchronously with respect
//! to the update that triggered them.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::errors::SessionError;

// =============================================================================
// Snapshot & Patch
// =============================================================================

/// The single observable session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Transport room connection established.
    pub connected: bool,
    /// Microphone capture running.
    pub recording: bool,
    /// Speech recognition running. True only while `recording` is true.
    pub listening: bool,
    /// Synthesis playback in progress.
    pub speaking: bool,
    /// Latest recognized transcript.
    pub transcript: String,
    /// Live loudness, clamped to [0, 100].
    pub volume: f32,
    /// Most recent error message, if any.
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            connected: false,
            recording: false,
            listening: false,
            speaking: false,
            transcript: String::new(),
            volume: 0.0,
            last_error: None,
        }
    }
}

/// A partial state update. Unset fields leave the snapshot untouched.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub connected: Option<bool>,
    pub recording: Option<bool>,
    pub listening: Option<bool>,
    pub speaking: Option<bool>,
    pub transcript: Option<String>,
    pub volume: Option<f32>,
    pub last_error: Option<String>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(mut self, value: bool) -> Self {
        self.connected = Some(value);
        self
    }

    pub fn recording(mut self, value: bool) -> Self {
        self.recording = Some(value);
        self
    }

    pub fn listening(mut self, value: bool) -> Self {
        self.listening = Some(value);
        self
    }

    pub fn speaking(mut self, value: bool) -> Self {
        self.speaking = Some(value);
        self
    }

    pub fn transcript(mut self, value: impl Into<String>) -> Self {
        self.transcript = Some(value.into());
        self
    }

    pub fn volume(mut self, value: f32) -> Self {
        self.volume = Some(value);
        self
    }

    pub fn last_error(mut self, value: impl Into<String>) -> Self {
        self.last_error = Some(value.into());
        self
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback for state-change notifications. Receives the full new snapshot.
pub type StateCallback = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Callback for transcript notifications.
pub type TranscriptCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback for error notifications.
pub type ErrorCallback = Arc<dyn Fn(&SessionError) + Send + Sync>;

/// Which registry a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    State,
    Transcript,
    Error,
}

/// Disposable subscription handle.
///
/// `cancel()` removes the callback from its registry. Dropping the handle
/// without cancelling leaves the subscription alive for the rest of the
/// session, which is the common case for UI observers.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    channel: Channel,
    aggregator: Weak<StateAggregator>,
}

impl Subscription {
    /// Remove the callback from its registry. Safe to call after teardown.
    pub fn cancel(self) {
        if let Some(aggregator) = self.aggregator.upgrade() {
            aggregator.remove(self.channel, self.id);
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

struct Registries {
    state: SessionState,
    next_id: u64,
    state_subs: Vec<(u64, StateCallback)>,
    transcript_subs: Vec<(u64, TranscriptCallback)>,
    error_subs: Vec<(u64, ErrorCallback)>,
}

/// Single source of truth for session state, plus observer fan-out.
pub struct StateAggregator {
    inner: Mutex<Registries>,
    /// Once set, every update, notification, and registration is a no-op.
    /// Checked by every scheduled callback path so late async completions
    /// cannot mutate a torn-down session.
    destroyed: AtomicBool,
}

impl StateAggregator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Registries {
                state: SessionState::default(),
                next_id: 1,
                state_subs: Vec::new(),
                transcript_subs: Vec::new(),
                error_subs: Vec::new(),
            }),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Whether teardown has completed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    /// Merge a patch into the snapshot and synchronously notify state
    /// subscribers with the full new snapshot.
    pub fn update(&self, patch: StatePatch) {
        if self.is_destroyed() {
            return;
        }

        let (snapshot, subs) = {
            let mut inner = self.inner.lock();
            apply_patch(&mut inner.state, patch);
            (inner.state.clone(), inner.state_subs.clone())
        };

        for (_, callback) in &subs {
            callback(&snapshot);
        }
    }

    /// Forward a non-empty transcript: merges it into the snapshot (notifying
    /// state subscribers) and fires transcript subscribers in addition.
    pub fn forward_transcript(&self, transcript: &str) {
        if self.is_destroyed() || transcript.is_empty() {
            return;
        }

        let (snapshot, state_subs, transcript_subs) = {
            let mut inner = self.inner.lock();
            inner.state.transcript = transcript.to_string();
            (
                inner.state.clone(),
                inner.state_subs.clone(),
                inner.transcript_subs.clone(),
            )
        };

        for (_, callback) in &state_subs {
            callback(&snapshot);
        }
        for (_, callback) in &transcript_subs {
            callback(transcript);
        }
    }

    /// Record an error: writes `last_error`, notifies state subscribers with
    /// the new snapshot, then fires error subscribers with the domain error.
    pub fn report_error(&self, error: &SessionError) {
        if self.is_destroyed() {
            return;
        }
        debug!(code = %error.code(), "recording session error");

        let (snapshot, state_subs, error_subs) = {
            let mut inner = self.inner.lock();
            inner.state.last_error = Some(error.to_string());
            (
                inner.state.clone(),
                inner.state_subs.clone(),
                inner.error_subs.clone(),
            )
        };

        for (_, callback) in &state_subs {
            callback(&snapshot);
        }
        for (_, callback) in &error_subs {
            callback(error);
        }
    }

    /// Register a state-change subscriber.
    pub fn on_state_change(self: &Arc<Self>, callback: StateCallback) -> Subscription {
        self.register(Channel::State, |inner, id| {
            inner.state_subs.push((id, callback))
        })
    }

    /// Register a transcript subscriber.
    pub fn on_transcript(self: &Arc<Self>, callback: TranscriptCallback) -> Subscription {
        self.register(Channel::Transcript, |inner, id| {
            inner.transcript_subs.push((id, callback))
        })
    }

    /// Register an error subscriber.
    pub fn on_error(self: &Arc<Self>, callback: ErrorCallback) -> Subscription {
        self.register(Channel::Error, |inner, id| {
            inner.error_subs.push((id, callback))
        })
    }

    /// Tear down: clear every registry, reset the snapshot to defaults, and
    /// make all further calls no-ops.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut inner = self.inner.lock();
        inner.state_subs.clear();
        inner.transcript_subs.clear();
        inner.error_subs.clear();
        inner.state = SessionState::default();
    }

    fn register(
        self: &Arc<Self>,
        channel: Channel,
        insert: impl FnOnce(&mut Registries, u64),
    ) -> Subscription {
        if self.is_destroyed() {
            // Inert handle; cancel() finds nothing to remove.
            return Subscription { id: 0, channel, aggregator: Weak::new() };
        }
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            insert(&mut inner, id);
            id
        };
        Subscription { id, channel, aggregator: Arc::downgrade(self) }
    }

    fn remove(&self, channel: Channel, id: u64) {
        let mut inner = self.inner.lock();
        match channel {
            Channel::State => inner.state_subs.retain(|(sid, _)| *sid != id),
            Channel::Transcript => inner.transcript_subs.retain(|(sid, _)| *sid != id),
            Channel::Error => inner.error_subs.retain(|(sid, _)| *sid != id),
        }
    }
}

/// Merge a patch, enforcing the snapshot invariants: volume clamped to
/// [0, 100], and `listening` never true while `recording` is false.
fn apply_patch(state: &mut SessionState, patch: StatePatch) {
    if let Some(connected) = patch.connected {
        state.connected = connected;
    }
    if let Some(recording) = patch.recording {
        state.recording = recording;
    }
    if let Some(listening) = patch.listening {
        state.listening = listening;
    }
    if let Some(speaking) = patch.speaking {
        state.speaking = speaking;
    }
    if let Some(transcript) = patch.transcript {
        state.transcript = transcript;
    }
    if let Some(volume) = patch.volume {
        state.volume = volume.clamp(0.0, 100.0);
    }
    if let Some(last_error) = patch.last_error {
        state.last_error = Some(last_error);
    }
    if !state.recording {
        state.listening = false;
    }
}
