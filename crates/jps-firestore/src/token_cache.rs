//! Access-token cache for Firestore authentication.
//!
//! Tokens are refreshed a minute before they expire. Concurrent callers that
//! find a stale token queue behind a single refresh, and a failed refresh falls
//! back to the old token while it is still accepted by the server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Refresh this long before the reported expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the reported expiry cannot be converted.
const FALLBACK_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for the Firestore REST API.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Remaining lifetime of a token expiring at `expires_at`.
fn remaining_ttl(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    if expires_at <= now {
        return Duration::ZERO;
    }
    (expires_at - now).to_std().unwrap_or(FALLBACK_TTL)
}

/// Shared cache in front of a [`TokenProvider`].
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    slot: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            slot: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// Return a bearer token, refreshing it if it is about to expire.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let mut slot = self.slot.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref().filter(|c| c.is_fresh(Instant::now())) {
            return Ok(cached.access_token.clone());
        }

        match self.provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let ttl = remaining_ttl(token.expires_at(), Utc::now());
                let access_token = token.as_str().to_string();
                *slot = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at: Instant::now() + ttl,
                });
                debug!(ttl_secs = ttl.as_secs(), "Refreshed Firestore access token");
                Ok(access_token)
            }
            Err(e) => match slot.as_ref().filter(|c| c.is_usable(Instant::now())) {
                Some(cached) => {
                    warn!("Token refresh failed, reusing current token: {}", e);
                    Ok(cached.access_token.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain access token: {}",
                    e
                ))),
            },
        }
    }

    async fn fresh_token(&self) -> Option<String> {
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_fresh(Instant::now()))
            .map(|c| c.access_token.clone())
    }
}
