//! OAuth2 client-credentials token lifecycle.
//!
//! The imagery provider bills per request and authenticates every call with
//! a bearer token obtained through the client-credentials grant. The token
//! cache keeps the single process-wide token, returns it without I/O while
//! it is still valid, and refreshes it behind a double-checked write lock
//! so concurrent callers converge on one outstanding exchange.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::UpstreamError;

/// Safety margin subtracted from the advertised expiry so a token is never
/// presented right at its deadline.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Floor applied to the provider's `expires_in`, matching the margin so a
/// fresh token is usable at least once.
const MIN_VALIDITY: Duration = Duration::from_secs(30);

/// Validity assumed when the token response omits `expires_in`.
const DEFAULT_VALIDITY_SECS: u64 = 3600;

#[derive(Clone)]
struct AccessToken {
    secret: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_VALIDITY_SECS
}

/// Caching OAuth2 client for the provider's token endpoint.
///
/// The raw token never leaves this module except as the value handed to the
/// request builder; callers hold the cache, not the token.
pub struct TokenCache {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    state: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    /// Create a cache exchanging credentials at `token_url`.
    ///
    /// The `reqwest::Client` carries the per-call timeout; a timed-out
    /// exchange surfaces as [`UpstreamError::Timeout`].
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            state: RwLock::new(None),
        }
    }

    /// Return a valid bearer token, refreshing it first if needed.
    ///
    /// A non-2xx answer from the token endpoint is fatal for this call and
    /// carries the provider's status; it is not retried here.
    pub async fn get_token(&self) -> Result<String, UpstreamError> {
        if let Some(token) = self.state.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.secret.clone());
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = state.as_ref() {
            if token.is_fresh() {
                return Ok(token.secret.clone());
            }
        }

        let token = self.exchange().await?;
        let secret = token.secret.clone();
        // Last writer wins; a duplicate refresh under race is harmless
        *state = Some(token);
        Ok(secret)
    }

    async fn exchange(&self) -> Result<AccessToken, UpstreamError> {
        debug!(url = %self.token_url, "refreshing provider access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::TokenExchange {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| UpstreamError::Transport(format!("malformed token response: {err}")))?;

        let validity = Duration::from_secs(body.expires_in).max(MIN_VALIDITY);
        Ok(AccessToken {
            secret: body.access_token,
            expires_at: Instant::now() + validity,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
