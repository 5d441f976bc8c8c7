//! Binding between the session and the transport room capability.
//!
//! The binding wires the room event handler at construction time, strictly
//! before any connect attempt, folds room events into the state aggregator,
//! auto-attaches remote audio for playback when autoplay is on, and makes
//! `disconnect` idempotent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::core::room::base::{
    LocalAudioTrack, RoomEvent, TrackPublication, TransportRoom,
};
use crate::core::state::{StateAggregator, StatePatch};
use crate::errors::{SessionError, SessionResult};

/// Session-side owner of the room connection.
pub struct RoomBinding {
    room: Arc<dyn TransportRoom>,
    aggregator: Arc<StateAggregator>,
    connected: Arc<AtomicBool>,
}

impl RoomBinding {
    /// Create the binding and register the room event handler.
    ///
    /// Registration happens here, in the constructor, so that no event can be
    /// missed between a later `connect` call and handler installation.
    pub fn new(
        room: Arc<dyn TransportRoom>,
        aggregator: Arc<StateAggregator>,
        autoplay: bool,
    ) -> Arc<Self> {
        let connected = Arc::new(AtomicBool::new(false));

        let handler_room = Arc::downgrade(&room);
        let handler_aggregator = aggregator.clone();
        let handler_connected = connected.clone();
        room.set_event_handler(Arc::new(move |event| {
            // Destroyed guard: a late event after teardown must not mutate
            // state or re-attach playback.
            if handler_aggregator.is_destroyed() {
                return;
            }
            match event {
                RoomEvent::Connected => {
                    info!("room connected");
                    if !handler_connected.swap(true, Ordering::SeqCst) {
                        handler_aggregator.update(StatePatch::new().connected(true));
                    }
                }
                RoomEvent::Disconnected { reason } => {
                    info!(reason = ?reason, "room disconnected");
                    if handler_connected.swap(false, Ordering::SeqCst) {
                        handler_aggregator.update(StatePatch::new().connected(false));
                    }
                }
                RoomEvent::ParticipantJoined { identity } => {
                    debug!(identity = %identity, "remote participant joined");
                }
                RoomEvent::TrackSubscribed { participant, track_sid } => {
                    debug!(
                        participant = %participant,
                        track_sid = %track_sid,
                        "remote audio track available"
                    );
                    if autoplay {
                        if let Some(room) = handler_room.upgrade() {
                            room.attach_remote_track(&track_sid);
                        }
                    }
                }
                RoomEvent::TrackUnsubscribed { participant, track_sid } => {
                    debug!(
                        participant = %participant,
                        track_sid = %track_sid,
                        "remote audio track removed"
                    );
                    if let Some(room) = handler_room.upgrade() {
                        room.detach_remote_track(&track_sid);
                    }
                }
                RoomEvent::Failure { message } => {
                    warn!(message = %message, "transport failure");
                    handler_aggregator.report_error(&SessionError::VoiceError(message));
                }
            }
        }));

        Arc::new(Self { room, aggregator, connected })
    }

    /// Connect to the room. The connected flag flips on success even if the
    /// transport also delivers a `Connected` event; whichever lands first
    /// wins and the state update fires once.
    pub async fn connect(&self, endpoint: &str, token: &str) -> SessionResult<()> {
        self.room.connect(endpoint, token).await?;
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.aggregator.update(StatePatch::new().connected(true));
        }
        Ok(())
    }

    /// Close the room connection. A second call when already disconnected is
    /// a no-op and never errors.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.room.disconnect().await;
        self.aggregator.update(StatePatch::new().connected(false));
    }

    /// Whether the room is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Publish a locally-captured track. Ownership of the underlying stream
    /// stays with the capture pipeline.
    pub async fn publish_track(&self, track: LocalAudioTrack) -> SessionResult<TrackPublication> {
        self.room.publish_track(track).await
    }

    /// Unpublish a previously published track.
    pub async fn unpublish_track(&self, publication: TrackPublication) -> SessionResult<()> {
        self.room.unpublish_track(publication).await
    }
}
