//! Credential acquisition and background refresh.
//!
//! Two strategies, selected by [`CredentialMode`]: pass-through of a
//! caller-supplied token (never refreshed), or a POST to the issuance
//! endpoint for `{token, expiresIn}`. Server-issued credentials get a
//! background refresh task scheduled at 5/6 (~83%) of the declared lifetime,
//! leaving a safety margin before expiry.
//!
//! A refresh failure is reported through the error channel and nothing else
//! happens: the live room keeps using its already-negotiated session, since
//! most transports cannot hot-swap credentials mid-connection. The refreshed
//! token is cached for any later connect.

use parking_lot::Mutex as SyncMutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CredentialMode, SessionConfig};
use crate::core::state::StateAggregator;
use crate::errors::{SessionError, SessionResult};

/// Timeout for the token endpoint call.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh at 5/6 of the declared lifetime (50 minutes of a one-hour token).
const REFRESH_NUMERATOR: u64 = 5;
const REFRESH_DENOMINATOR: u64 = 6;

// =============================================================================
// Wire Types
// =============================================================================

/// Request body for the credential issuance endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    room_name: &'a str,
    participant_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    participant_identity: Option<&'a str>,
}

/// Success response from the credential issuance endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token: String,
    /// Declared lifetime in seconds.
    expires_in: u64,
}

/// Failure response body; the error text is surfaced unmodified.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
}

// =============================================================================
// Credential
// =============================================================================

/// A bearer token plus its declared lifetime. Owned by the provider; the
/// token leaves the session only inside the transport connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_in: Option<Duration>,
}

impl Credential {
    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Declared lifetime, absent for caller-supplied tokens.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

/// Delay before refreshing a credential with the given lifetime.
fn refresh_delay(expires_in: Duration) -> Duration {
    let secs = expires_in.as_secs() * REFRESH_NUMERATOR / REFRESH_DENOMINATOR;
    // A pathologically short lifetime still gets a sane polling floor.
    Duration::from_secs(secs.max(1))
}

// =============================================================================
// Provider
// =============================================================================

/// Resolves the session's room credential and keeps it fresh.
pub struct CredentialProvider {
    mode: CredentialMode,
    room_name: String,
    participant_name: String,
    participant_identity: Option<String>,
    http: Client,
    /// Most recently issued credential (server-issued mode only).
    current: SyncMutex<Option<Credential>>,
    refresh_cancel: CancellationToken,
    refresh_task: SyncMutex<Option<JoinHandle<()>>>,
}

impl CredentialProvider {
    /// Build a provider from the session config. The config has already been
    /// validated, so a `provided` mode carries a non-empty token here.
    pub fn new(config: &SessionConfig) -> SessionResult<Arc<Self>> {
        let http = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                SessionError::TokenGenerationFailed(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Arc::new(Self {
            mode: config.credentials.clone(),
            room_name: config.room_name.clone(),
            participant_name: config.participant_name.clone(),
            participant_identity: config.participant_identity.clone(),
            http,
            current: SyncMutex::new(None),
            refresh_cancel: CancellationToken::new(),
            refresh_task: SyncMutex::new(None),
        }))
    }

    /// Resolve a credential: pass-through for `provided`, endpoint call for
    /// `server-issued` (preferring a token cached by a refresh).
    pub async fn acquire(&self) -> SessionResult<Credential> {
        match &self.mode {
            CredentialMode::Provided { token } => Ok(Credential {
                token: token.clone(),
                expires_in: None,
            }),
            CredentialMode::ServerIssued { token_endpoint } => {
                if let Some(credential) = self.current.lock().clone() {
                    debug!("using cached credential from refresh");
                    return Ok(credential);
                }
                let credential = self.fetch_token(token_endpoint).await?;
                *self.current.lock() = Some(credential.clone());
                Ok(credential)
            }
        }
    }

    /// POST the issuance request and normalize the outcome. Any non-success
    /// status maps to `TOKEN_GENERATION_FAILED` carrying the server-provided
    /// error text unmodified; no internal retry.
    async fn fetch_token(&self, token_endpoint: &str) -> SessionResult<Credential> {
        let request = TokenRequest {
            room_name: &self.room_name,
            participant_name: &self.participant_name,
            participant_identity: self.participant_identity.as_deref(),
        };

        let response = self
            .http
            .post(token_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::TokenGenerationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<TokenErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => format!("token endpoint returned status {status}"),
            };
            return Err(SessionError::TokenGenerationFailed(message));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SessionError::TokenGenerationFailed(format!("malformed token response: {e}")))?;

        debug!(expires_in = body.expires_in, "credential issued");
        Ok(Credential {
            token: body.token,
            expires_in: Some(Duration::from_secs(body.expires_in)),
        })
    }

    /// Schedule the background refresh for a server-issued credential.
    ///
    /// No-op for `provided` mode or when the credential carries no lifetime.
    /// Refresh failures go to the error channel and the task keeps its
    /// cadence; the session is never torn down over a failed refresh.
    pub fn schedule_refresh(
        self: &Arc<Self>,
        credential: &Credential,
        aggregator: Arc<StateAggregator>,
    ) {
        let CredentialMode::ServerIssued { token_endpoint } = &self.mode else {
            return;
        };
        let Some(expires_in) = credential.expires_in() else {
            return;
        };

        let endpoint = token_endpoint.clone();
        let provider = self.clone();
        let cancel = self.refresh_cancel.clone();
        let mut delay = refresh_delay(expires_in);
        info!(delay_secs = delay.as_secs(), "credential refresh scheduled");

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                if cancel.is_cancelled() || aggregator.is_destroyed() {
                    break;
                }
                match provider.fetch_token(&endpoint).await {
                    Ok(credential) => {
                        info!("credential refreshed");
                        if let Some(expires_in) = credential.expires_in() {
                            delay = refresh_delay(expires_in);
                        }
                        *provider.current.lock() = Some(credential);
                    }
                    Err(error) => {
                        // Reported, not fatal: the live connection rides out
                        // its negotiated session.
                        warn!(error = %error, "credential refresh failed");
                        aggregator.report_error(&error);
                    }
                }
            }
            debug!("credential refresh task ended");
        });

        *self.refresh_task.lock() = Some(task);
    }

    /// Cancel the refresh task and wait for it to finish. Idempotent.
    pub async fn stop_refresh(&self) {
        self.refresh_cancel.cancel();
        let task = self.refresh_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Whether a refresh task is currently scheduled.
    pub fn refresh_scheduled(&self) -> bool {
        self.refresh_task.lock().is_some()
    }
}
