//! Real-time voice session orchestration with pluggable transport, capture,
//! recognition, and synthesis backends.
//!
//! The crate turns a "start talking" intent into a live bidirectional audio
//! session: it resolves a room credential (pre-issued or server-issued, with
//! background refresh), connects a real-time transport room, captures and
//! publishes microphone audio, meters live loudness, runs continuous speech
//! recognition, and plays synthesized speech, folding everything into one
//! observable [`SessionState`] snapshot and tearing every subsystem down
//! deterministically on disconnect.
//!
//! Platform specifics stay behind four narrow capability traits
//! ([`TransportRoom`], [`CaptureDevice`], [`Recognizer`], [`Synthesizer`])
//! injected at construction, so the orchestration core is portable and fully
//! testable with in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voxsession::{CredentialMode, SessionCapabilities, SessionConfig, VoiceSession};
//!
//! # async fn example(capabilities: SessionCapabilities) {
//! let config = SessionConfig::new(
//!     "wss://rtc.example.com",
//!     "support-room",
//!     "Visitor",
//!     CredentialMode::ServerIssued {
//!         token_endpoint: "https://api.example.com/voice/token".to_string(),
//!     },
//! );
//!
//! let session = VoiceSession::new(config, capabilities).unwrap();
//! let _sub = session.on_state_change(Arc::new(|state| {
//!     println!("connected={} volume={}", state.connected, state.volume);
//! }));
//!
//! session.connect().await;
//! session.start_recording().await;
//! session.speak("How can I help you today?").await.ok();
//! session.disconnect().await;
//! # }
//! ```

pub mod config;
pub mod core;
pub mod errors;

// Re-export commonly used items for convenience
pub use config::{CredentialMode, SessionConfig, VoiceSettings};
pub use core::*;
pub use errors::{ErrorCode, SessionError, SessionResult};
