//! Session configuration.
//!
//! A [`SessionConfig`] is the immutable construction input for a voice
//! session: where to connect, who is joining, how the credential is acquired,
//! and how synthesized speech should sound. Validation is synchronous and
//! happens once, at session construction. It is the only failure a caller
//! ever sees as a returned error from setup; everything later flows through
//! the error channel.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::{SessionError, SessionResult};

/// How the session obtains its room access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CredentialMode {
    /// The caller supplies a pre-issued token. Never refreshed.
    Provided {
        /// The bearer token authorizing the participant to join the room.
        token: String,
    },
    /// The session requests a fresh token from an issuance endpoint and
    /// schedules a background refresh before it expires.
    ServerIssued {
        /// Base URL of the credential issuance endpoint.
        token_endpoint: String,
    },
}

/// Voice playback and recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Spoken-language tag for recognition and synthesis (e.g. "en-US").
    #[serde(default = "default_language")]
    pub language: String,

    /// Preferred synthesis voice, if the platform offers a choice.
    #[serde(default)]
    pub preferred_voice: Option<String>,

    /// Playback rate multiplier (1.0 = normal).
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Playback pitch multiplier (1.0 = normal).
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// Attach remote audio tracks for playback as soon as they appear.
    #[serde(default = "default_true")]
    pub autoplay: bool,

    /// Master switch for synthesis. When off, `speak()` resolves without
    /// engaging the synthesizer.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_rate() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            preferred_voice: None,
            rate: default_rate(),
            pitch: default_pitch(),
            autoplay: true,
            enabled: true,
        }
    }
}

/// Immutable construction input for a voice session.
///
/// # Example
///
/// ```rust
/// use voxsession::config::{CredentialMode, SessionConfig, VoiceSettings};
///
/// let config = SessionConfig::new(
///     "wss://rtc.example.com",
///     "support-room",
///     "Visitor",
///     CredentialMode::ServerIssued {
///         token_endpoint: "https://api.example.com/voice/token".to_string(),
///     },
/// );
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Real-time transport endpoint (ws/wss URL).
    pub endpoint: String,

    /// Identifier of the room to join.
    pub room_name: String,

    /// Human-readable participant display name.
    pub participant_name: String,

    /// Stable participant identity. Generated (uuid v4) when not supplied.
    #[serde(default)]
    pub participant_identity: Option<String>,

    /// Credential acquisition mode.
    pub credentials: CredentialMode,

    /// Voice playback and recognition settings.
    #[serde(default)]
    pub voice: VoiceSettings,
}

impl SessionConfig {
    /// Create a config with default voice settings and a generated identity.
    pub fn new(
        endpoint: impl Into<String>,
        room_name: impl Into<String>,
        participant_name: impl Into<String>,
        credentials: CredentialMode,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            room_name: room_name.into(),
            participant_name: participant_name.into(),
            participant_identity: None,
            credentials,
            voice: VoiceSettings::default(),
        }
    }

    /// Validate the configuration.
    ///
    /// Fails with `MISSING_TOKEN` when `provided` mode carries an empty
    /// token, and with `VOICE_ERROR` when the endpoint or token endpoint is
    /// not a parseable URL. This is the session's only synchronous failure
    /// path.
    pub fn validate(&self) -> SessionResult<()> {
        match &self.credentials {
            CredentialMode::Provided { token } => {
                if token.trim().is_empty() {
                    return Err(SessionError::MissingToken(
                        "credential mode is 'provided' but no token was supplied".to_string(),
                    ));
                }
            }
            CredentialMode::ServerIssued { token_endpoint } => {
                Url::parse(token_endpoint).map_err(|e| {
                    SessionError::VoiceError(format!(
                        "invalid token endpoint '{token_endpoint}': {e}"
                    ))
                })?;
            }
        }

        Url::parse(&self.endpoint).map_err(|e| {
            SessionError::VoiceError(format!("invalid transport endpoint '{}': {e}", self.endpoint))
        })?;

        if self.room_name.trim().is_empty() {
            return Err(SessionError::VoiceError("room name must not be empty".to_string()));
        }
        if self.participant_name.trim().is_empty() {
            return Err(SessionError::VoiceError(
                "participant name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the participant identity, generating one when absent.
    ///
    /// Called once at session construction so the config snapshot a caller
    /// reads back is complete.
    pub fn resolve_identity(&mut self) -> &str {
        if self.participant_identity.is_none() {
            self.participant_identity = Some(format!("visitor-{}", Uuid::new_v4()));
        }
        self.participant_identity.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provided(token: &str) -> SessionConfig {
        SessionConfig::new(
            "wss://rtc.example.com",
            "room-1",
            "Visitor",
            CredentialMode::Provided { token: token.to_string() },
        )
    }

    #[test]
    fn test_validate_accepts_provided_token() {
        assert!(provided("tok").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_provided_token() {
        let err = provided("").validate().unwrap_err();
        assert_eq!(err.code().as_str(), "MISSING_TOKEN");

        // Whitespace-only is just as missing.
        let err = provided("   ").validate().unwrap_err();
        assert_eq!(err.code().as_str(), "MISSING_TOKEN");
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = provided("tok");
        config.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_token_endpoint() {
        let config = SessionConfig::new(
            "wss://rtc.example.com",
            "room-1",
            "Visitor",
            CredentialMode::ServerIssued { token_endpoint: "::nope::".to_string() },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_identity_generates_once() {
        let mut config = provided("tok");
        let first = config.resolve_identity().to_string();
        assert!(first.starts_with("visitor-"));
        // Stable across calls.
        assert_eq!(config.resolve_identity(), first);
    }

    #[test]
    fn test_resolve_identity_keeps_explicit_value() {
        let mut config = provided("tok");
        config.participant_identity = Some("agent-7".to_string());
        assert_eq!(config.resolve_identity(), "agent-7");
    }

    #[test]
    fn test_voice_settings_defaults() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.language, "en-US");
        assert_eq!(settings.rate, 1.0);
        assert_eq!(settings.pitch, 1.0);
        assert!(settings.autoplay);
        assert!(settings.enabled);
    }

    #[test]
    fn test_credential_mode_serde_tagging() {
        let mode = CredentialMode::ServerIssued {
            token_endpoint: "https://api.example.com/token".to_string(),
        };
        let json = serde_json::to_string(&mode).unwrap();
        assert!(json.contains("\"mode\":\"server-issued\""));
    }
}
