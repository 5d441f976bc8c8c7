//! Base trait and types for the real-time transport room capability.
//!
//! The session never talks to a concrete transport directly; it drives this
//! seam. A production integration wraps whatever room SDK the platform uses
//! (connect/publish/subscribe model); tests inject an in-memory fake.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::SessionResult;

// =============================================================================
// Track Handles
// =============================================================================

/// Handle to a locally-captured audio track, produced by the capture stream
/// and handed to the room for publishing. The capture pipeline keeps
/// ownership of the underlying device stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAudioTrack {
    /// Transport-level identifier of the track.
    pub id: String,
}

/// Handle to a published track, returned by `publish_track` and required to
/// unpublish it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPublication {
    /// Server-assigned publication id.
    pub sid: String,
}

// =============================================================================
// Events
// =============================================================================

/// Room-level events surfaced by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The room connection was established.
    Connected,
    /// The room connection was closed or lost.
    Disconnected {
        /// Transport-provided reason, if any.
        reason: Option<String>,
    },
    /// A remote participant joined the room.
    ParticipantJoined {
        /// Identity of the joining participant.
        identity: String,
    },
    /// A remote audio track became available for playback.
    TrackSubscribed {
        /// Identity of the publishing participant.
        participant: String,
        /// Transport-level id of the remote track.
        track_sid: String,
    },
    /// A remote audio track went away.
    TrackUnsubscribed {
        /// Identity of the publishing participant.
        participant: String,
        /// Transport-level id of the remote track.
        track_sid: String,
    },
    /// A transport-level runtime failure that did not close the room.
    Failure {
        /// Transport-provided description.
        message: String,
    },
}

/// Callback for room events. Invoked from the transport's event delivery;
/// implementations must be cheap and non-blocking.
pub type RoomEventCallback = Arc<dyn Fn(RoomEvent) + Send + Sync>;

// =============================================================================
// Capability Trait
// =============================================================================

/// The real-time transport room capability.
///
/// Contract notes:
/// - `set_event_handler` must be callable before `connect`, and events fired
///   during connect must reach a handler registered beforehand.
/// - `disconnect` on an already-disconnected room is a no-op.
/// - an attached remote track plays out through the platform's audio output;
///   `detach_remote_track` silences it again.
#[async_trait]
pub trait TransportRoom: Send + Sync {
    /// Register the event handler. Called exactly once, before `connect`.
    fn set_event_handler(&self, callback: RoomEventCallback);

    /// Connect to the room at `url`, authorized by `token`.
    async fn connect(&self, url: &str, token: &str) -> SessionResult<()>;

    /// Close the room connection. Idempotent.
    async fn disconnect(&self);

    /// Publish a locally-captured audio track.
    async fn publish_track(&self, track: LocalAudioTrack) -> SessionResult<TrackPublication>;

    /// Unpublish a previously published track.
    async fn unpublish_track(&self, publication: TrackPublication) -> SessionResult<()>;

    /// Attach a remote track for playback.
    fn attach_remote_track(&self, track_sid: &str);

    /// Detach a remote track from playback.
    fn detach_remote_track(&self, track_sid: &str);
}
