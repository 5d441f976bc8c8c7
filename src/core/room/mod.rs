pub mod base;
mod binding;

pub use base::{
    LocalAudioTrack, RoomEvent, RoomEventCallback, TrackPublication, TransportRoom,
};
pub use binding::RoomBinding;
