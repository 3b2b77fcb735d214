//! Access-token cache for the catalog API.
//!
//! One token is shared by every request. It is read from memory until it
//! is within [`REFRESH_MARGIN`] of expiry, then refreshed lazily by the
//! next caller. Tokens issued for less than twice the margin are refreshed
//! halfway through their lifetime instead. Refreshes are single-flight: callers that find the token
//! expired queue on the cache's mutex and re-check after acquiring it, so
//! a burst of concurrent expirations issues one refresh call.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::CatalogConfig;
use crate::error::CatalogError;

/// Tokens are refreshed this long before their reported expiry.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A freshly issued token as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

/// Source of new access tokens.
pub trait TokenRefresher: Send + Sync {
    fn fetch_token(&self) -> impl Future<Output = Result<FetchedToken, CatalogError>> + Send;
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// When a token issued now for `expires_in` should be replaced.
fn refresh_deadline(issued: Instant, expires_in: Duration) -> Instant {
    issued + expires_in - REFRESH_MARGIN.min(expires_in / 2)
}

pub struct TokenCache<R> {
    refresher: R,
    current: Mutex<Option<CachedToken>>,
}

impl<R: TokenRefresher> TokenCache<R> {
    pub fn new(refresher: R) -> Self {
        Self {
            refresher,
            current: Mutex::new(None),
        }
    }

    /// Return a valid token, refreshing it first if missing or near expiry.
    pub async fn get(&self) -> Result<String, CatalogError> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Catalog access token missing or expiring, refreshing");
        let fetched = self.refresher.fetch_token().await?;
        let value = fetched.access_token.clone();
        *current = Some(CachedToken {
            value: fetched.access_token,
            refresh_at: refresh_deadline(Instant::now(), fetched.expires_in),
        });
        tracing::info!(
            expires_in_secs = fetched.expires_in.as_secs(),
            "Catalog access token refreshed"
        );
        Ok(value)
    }

    /// Drop the cached token so the next [`get`](Self::get) refreshes.
    ///
    /// Used when the catalog rejects a token before its reported expiry.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}

// ---------------------------------------------------------------------------
// Twitch client-credentials refresher
// ---------------------------------------------------------------------------

/// OAuth client-credentials grant against the Twitch identity service.
pub struct TwitchRefresher {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl TwitchRefresher {
    pub fn new(http: reqwest::Client, config: &CatalogConfig) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

impl TokenRefresher for TwitchRefresher {
    async fn fetch_token(&self) -> Result<FetchedToken, CatalogError> {
        let response = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CatalogError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(FetchedToken {
            access_token: token.access_token,
            expires_in: Duration::from_secs(token.expires_in),
        })
    }
}
