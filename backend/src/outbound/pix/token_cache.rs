//! In-process cache for the gateway's OAuth bearer token.
//!
//! The lock is held across a refresh so concurrent requests wait for one
//! token exchange instead of each starting their own.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

/// Tokens are treated as expired this long before the gateway says so.
const REFRESH_MARGIN_SECONDS: i64 = 60;
/// Upper bound on the lifetime honoured from a token response.
const MAX_LIFETIME_SECONDS: u64 = 86_400;

/// Token as issued by the gateway.
pub(super) struct IssuedToken {
    pub access_token: Zeroizing<String>,
    pub expires_in: u64,
}

struct CachedToken {
    access_token: Zeroizing<String>,
    refresh_at: DateTime<Utc>,
}

pub(super) struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub(super) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(None),
            clock,
        }
    }

    /// Return the cached token, calling `fetch` when none is fresh.
    pub(super) async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<Zeroizing<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, E>>,
    {
        let mut slot = self.slot.lock().await;
        let now = self.clock.utc();
        if let Some(cached) = slot.as_ref().filter(|cached| now < cached.refresh_at) {
            return Ok(cached.access_token.clone());
        }

        let issued = fetch().await?;
        let lifetime = i64::try_from(issued.expires_in.min(MAX_LIFETIME_SECONDS)).unwrap_or(0);
        let refresh_at = now + TimeDelta::seconds(lifetime - REFRESH_MARGIN_SECONDS);
        debug!(%refresh_at, "pix gateway token refreshed");
        let token = issued.access_token.clone();
        *slot = Some(CachedToken {
            access_token: issued.access_token,
            refresh_at,
        });
        Ok(token)
    }

    /// Drop the cached token, e.g. after the gateway rejected it.
    pub(super) async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}
