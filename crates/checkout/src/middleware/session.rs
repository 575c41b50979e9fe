//! Session middleware configuration.
//!
//! Sessions live in a bounded in-memory cache. A session lasts at most as long
//! as the browser session, and is dropped earlier once it sits idle or the
//! cache fills up. Nothing about a registration outlives it.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    session::{Id, Record},
    session_store,
};

use crate::config::CheckoutConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bgr_session";

/// In-memory session store with a capacity bound and an idle timeout.
///
/// Cookieless requests each create a record, so the store must evict on its
/// own rather than wait for a record's expiry date.
#[derive(Debug, Clone)]
pub struct CheckoutSessionStore {
    cache: Cache<Id, Record>,
}

impl CheckoutSessionStore {
    /// Create a store holding at most `capacity` sessions, each dropped after
    /// `idle_timeout` without a read or write.
    #[must_use]
    pub fn new(capacity: u64, idle_timeout: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle_timeout)
            .build();
        Self { cache }
    }

    /// Create a store sized from the checkout configuration.
    #[must_use]
    pub fn from_config(config: &CheckoutConfig) -> Self {
        Self::new(config.session_capacity, config.session_idle_timeout)
    }

    /// Number of live sessions after pending evictions are applied.
    #[cfg(test)]
    pub(crate) async fn live_sessions(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[async_trait]
impl SessionStore for CheckoutSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.cache.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self.cache.get(session_id).await)
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}

/// Create the session layer over `store`.
///
/// # Arguments
///
/// * `store` - Session store shared by every clone of the router
/// * `config` - Checkout configuration (for the secure-cookie decision)
#[must_use]
pub fn create_session_layer(
    store: CheckoutSessionStore,
    config: &CheckoutConfig,
) -> SessionManagerLayer<CheckoutSessionStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
