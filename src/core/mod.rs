pub mod capture;
pub mod credentials;
pub mod recognition;
pub mod room;
pub mod session;
pub mod state;
pub mod synthesis;
pub mod volume;

// Re-export commonly used types for convenience
pub use capture::{CaptureConstraints, CaptureDevice, CapturePipeline, CaptureStream, EnergyAnalyzer};
pub use credentials::{Credential, CredentialProvider};
pub use recognition::{
    RecognitionBridge, RecognitionCallback, RecognitionEvent, RecognizedSegment, Recognizer,
    RecognizerFault, RecognizerOptions,
};
pub use room::{
    LocalAudioTrack, RoomBinding, RoomEvent, RoomEventCallback, TrackPublication, TransportRoom,
};
pub use session::{SessionCapabilities, VoiceSession};
pub use state::{
    ErrorCallback, SessionState, StateAggregator, StateCallback, StatePatch, Subscription,
    TranscriptCallback,
};
pub use synthesis::{SpeechParams, SynthesisBridge, Synthesizer};
pub use volume::VolumeMonitor;
