//! The domain error for voice sessions.
//!
//! Every failure the session surfaces (construction-time validation, token
//! issuance, device permission, runtime capture/synthesis/transport faults)
//! is normalized to [`SessionError`]. Each variant carries a stable
//! [`ErrorCode`] so UI layers can branch on the code while displaying the
//! human-readable message.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// These are part of the crate's public contract: subscribers on the error
/// channel branch on the code, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A pre-issued credential was required at construction but missing or empty.
    MissingToken,
    /// The credential issuance endpoint returned a non-success response or
    /// could not be reached.
    TokenGenerationFailed,
    /// Microphone access was denied, either by the capture device or by the
    /// recognizer. One underlying cause, one code.
    MicrophoneDenied,
    /// Catch-all for capture, synthesis, and transport runtime failures.
    VoiceError,
}

impl ErrorCode {
    /// The wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingToken => "MISSING_TOKEN",
            ErrorCode::TokenGenerationFailed => "TOKEN_GENERATION_FAILED",
            ErrorCode::MicrophoneDenied => "MICROPHONE_DENIED",
            ErrorCode::VoiceError => "VOICE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors produced by a voice session.
///
/// Construction (`MissingToken`) is the only synchronous failure path; every
/// asynchronous lifecycle failure is written into the state snapshot and
/// fanned out to error subscribers instead of being returned, with the single
/// exception of `speak()` which has a direct one-shot caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No credential supplied for `provided` credential mode.
    #[error("Missing access token: {0}")]
    MissingToken(String),

    /// The token issuance endpoint failed; the message is the server-provided
    /// error text, unmodified.
    #[error("Token generation failed: {0}")]
    TokenGenerationFailed(String),

    /// Microphone access denied by the device or the recognizer.
    #[error("Microphone access denied: {0}")]
    MicrophoneDenied(String),

    /// Runtime capture/synthesis/transport failure.
    #[error("Voice error: {0}")]
    VoiceError(String),
}

impl SessionError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::MissingToken(_) => ErrorCode::MissingToken,
            SessionError::TokenGenerationFailed(_) => ErrorCode::TokenGenerationFailed,
            SessionError::MicrophoneDenied(_) => ErrorCode::MicrophoneDenied,
            SessionError::VoiceError(_) => ErrorCode::VoiceError,
        }
    }

    /// The message half of the error, without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            SessionError::MissingToken(m)
            | SessionError::TokenGenerationFailed(m)
            | SessionError::MicrophoneDenied(m)
            | SessionError::VoiceError(m) => m,
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
