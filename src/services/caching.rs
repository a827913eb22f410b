//! Two-tier reservation cache in front of the generic engine.
//!
//! Tier one is a process-local map that absorbs bursts on the same item with
//! zero I/O; tier two is the shared cache that lets sibling processes
//! converge on the same "this item is held" verdict without a store
//! round-trip per probe. Both tiers are advisory: the store stays
//! authoritative, and a stale entry at worst costs one conclusive store CAS.

use crate::error::{Error, Result};
use crate::model::{CheckoutCode, Item, ReservationEntry};
use crate::providers::{CheckoutService, ReservationCache};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// How often the janitor sweeps expired entries out of the local map.
const JANITOR_INTERVAL: Duration = Duration::from_secs(5);

type LocalMap = Arc<RwLock<HashMap<i64, ReservationEntry>>>;

/// Caching wrapper around a [`CheckoutService`].
///
/// Checkout consults the local map, then the shared cache, and only falls
/// through to the inner service on a miss or an expired entry. A live entry
/// held by the requesting user short-circuits with the existing token
/// (idempotent checkout); one held by anyone else short-circuits with
/// [`Error::ItemUnavailable`]. Purchase is never cached: the store verdict
/// is terminal.
pub struct CachingCheckout<S, C> {
    inner: S,
    shared: C,
    local: LocalMap,
    checkout_timeout: Duration,
}

impl<S, C> Clone for CachingCheckout<S, C>
where
    S: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            shared: self.shared.clone(),
            local: Arc::clone(&self.local),
            checkout_timeout: self.checkout_timeout,
        }
    }
}

impl<S, C> CachingCheckout<S, C>
where
    S: CheckoutService,
    C: ReservationCache + Clone + Send + Sync + 'static,
{
    /// Create the layer and start its janitor task.
    ///
    /// The janitor runs every five seconds, drops entries whose hold has
    /// expired, and stops when the shutdown signal fires.
    pub fn new(
        inner: S,
        shared: C,
        checkout_timeout: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let local: LocalMap = Arc::new(RwLock::new(HashMap::new()));

        let map = Arc::clone(&local);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(JANITOR_INTERVAL);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let now = Utc::now();
                        let mut entries = map.write().await;
                        let before = entries.len();
                        entries.retain(|_, entry| entry.live_at(now));
                        let removed = before - entries.len();
                        drop(entries);
                        if removed > 0 {
                            tracing::debug!(removed, "evicted expired local reservations");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });

        Self {
            inner,
            shared,
            local,
            checkout_timeout,
        }
    }

    /// Local map first, shared cache second. A shared hit repopulates the
    /// local map. May return an expired entry; liveness is the caller's
    /// check. Shared-cache errors are logged and treated as a miss.
    async fn lookup(&self, item_id: i64, now: DateTime<Utc>) -> Option<ReservationEntry> {
        {
            let map = self.local.read().await;
            if let Some(entry) = map.get(&item_id) {
                if entry.live_at(now) {
                    return Some(entry.clone());
                }
            }
        }

        match self.shared.get(item_id).await {
            Ok(Some(entry)) => {
                self.local.write().await.insert(item_id, entry.clone());
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, item_id, "can't read reservation from shared cache");
                None
            }
        }
    }
}

impl<S, C> CheckoutService for CachingCheckout<S, C>
where
    S: CheckoutService,
    C: ReservationCache + Clone + Send + Sync + 'static,
{
    async fn checkout(&self, user_id: i64, item_id: i64) -> Result<String> {
        let now = Utc::now();

        if let Some(entry) = self.lookup(item_id, now).await {
            if entry.live_at(now) {
                if entry.user_id == user_id {
                    // The caller's previous checkout is still valid.
                    return Ok(entry.code);
                }
                return Err(Error::ItemUnavailable);
            }
        }

        // Miss or expired hold: the store decides.
        let token = self.inner.checkout(user_id, item_id).await?;

        let entry = ReservationEntry {
            user_id,
            until: now
                + chrono::Duration::from_std(self.checkout_timeout)
                    .unwrap_or_else(|_| chrono::Duration::minutes(3)),
            code: token.clone(),
        };

        self.local.write().await.insert(item_id, entry.clone());

        // Only the one winner of this item reaches here at a time, so the
        // shared write needs no atomicity; it is detached with its own
        // deadline and the response never waits for it.
        let shared = self.shared.clone();
        let ttl = self.checkout_timeout;
        tokio::spawn(async move {
            if let Err(e) = shared.put(item_id, entry, ttl).await {
                tracing::error!(error = %e, item_id, "can't write reservation to shared cache");
            }
        });

        Ok(token)
    }

    async fn purchase(&self, code: &CheckoutCode) -> Result<()> {
        self.inner.purchase(code).await
    }

    async fn list_items(&self, page_num: i64, page_size: i64) -> Result<(Vec<Item>, i64)> {
        self.inner.list_items(page_num, page_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockAuditSink, MockItemStore, MockReservationCache};
    use crate::services::CheckoutGeneric;

    type Engine =
        CachingCheckout<CheckoutGeneric<MockItemStore, MockAuditSink>, MockReservationCache>;

    fn engine(hold: Duration) -> (Engine, MockItemStore, MockReservationCache) {
        let store = MockItemStore::new();
        let shared = MockReservationCache::new();
        let generic = CheckoutGeneric::new(store.clone(), MockAuditSink::new(), hold);
        let (_tx, rx) = broadcast::channel(1);
        let caching = CachingCheckout::new(generic, shared.clone(), hold, rx);
        (caching, store, shared)
    }

    #[tokio::test]
    async fn repeat_checkout_by_holder_returns_same_token() {
        let (engine, store, _) = engine(Duration::from_secs(180));
        store.insert_live_item(1, Utc::now());

        let first = engine.checkout(7, 1).await.unwrap();
        let second = engine.checkout(7, 1).await.unwrap();

        assert_eq!(first, second);
        // The second request was answered from cache, not the store.
        assert_eq!(store.reserve_calls(), 1);
    }

    #[tokio::test]
    async fn live_hold_by_another_user_short_circuits() {
        let (engine, store, _) = engine(Duration::from_secs(180));
        store.insert_live_item(1, Utc::now());

        engine.checkout(7, 1).await.unwrap();
        let err = engine.checkout(8, 1).await.unwrap_err();

        assert!(matches!(err, Error::ItemUnavailable));
        assert_eq!(store.reserve_calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_falls_through_to_store() {
        let (engine, store, _) = engine(Duration::from_millis(40));
        store.insert_live_item(1, Utc::now());

        let first = engine.checkout(7, 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let second = engine.checkout(8, 1).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.reserve_calls(), 2);
    }

    #[tokio::test]
    async fn shared_hit_populates_local_map_and_blocks_others() {
        let (engine, store, shared) = engine(Duration::from_secs(180));
        store.insert_live_item(1, Utc::now());

        // A sibling process recorded the hold; only the shared tier knows.
        shared.seed(
            1,
            ReservationEntry {
                user_id: 7,
                until: Utc::now() + chrono::Duration::minutes(3),
                code: "7:1:a1B2c3D4".to_string(),
            },
        );

        let token = engine.checkout(7, 1).await.unwrap();
        assert_eq!(token, "7:1:a1B2c3D4");

        let err = engine.checkout(8, 1).await.unwrap_err();
        assert!(matches!(err, Error::ItemUnavailable));
        assert_eq!(store.reserve_calls(), 0);
    }

    #[tokio::test]
    async fn shared_cache_failure_is_treated_as_miss() {
        let (engine, store, shared) = engine(Duration::from_secs(180));
        store.insert_live_item(1, Utc::now());
        shared.fail_with("shared cache down");

        // The store still decides; the request does not fail.
        engine.checkout(7, 1).await.unwrap();
        assert_eq!(store.reserve_calls(), 1);
    }

    #[tokio::test]
    async fn store_success_writes_back_to_shared_tier() {
        let (engine, store, shared) = engine(Duration::from_secs(180));
        store.insert_live_item(1, Utc::now());

        let token = engine.checkout(7, 1).await.unwrap();

        // The writeback is detached; give it a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let entry = shared.stored(1).unwrap();
        assert_eq!(entry.user_id, 7);
        assert_eq!(entry.code, token);
    }

    #[tokio::test]
    async fn janitor_sweeps_expired_entries() {
        let store = MockItemStore::new();
        store.insert_live_item(1, Utc::now());
        let generic =
            CheckoutGeneric::new(store.clone(), MockAuditSink::new(), Duration::from_millis(30));
        let (_tx, rx) = broadcast::channel(1);
        let engine = CachingCheckout::new(
            generic,
            MockReservationCache::new(),
            Duration::from_millis(30),
            rx,
        );

        engine.checkout(7, 1).await.unwrap();
        assert_eq!(engine.local.read().await.len(), 1);

        // One janitor interval past expiry.
        tokio::time::sleep(JANITOR_INTERVAL + Duration::from_millis(200)).await;
        assert!(engine.local.read().await.is_empty());
    }
}
