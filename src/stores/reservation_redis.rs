//! Redis-backed shared reservation tier.
//!
//! Keyed as `checkouts:{itemID}` with the entry wire form
//! `userID|untilEpoch|code` and a TTL equal to the reservation hold. Every
//! call carries its own deadline so a slow cache can never stall a request;
//! callers treat errors as a miss and fall through to the store.

use crate::error::{Error, Result};
use crate::model::ReservationEntry;
use crate::providers::ReservationCache;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

const KEY_PREFIX: &str = "checkouts:";

/// Reads are on the request path and get a tight deadline.
const READ_DEADLINE: Duration = Duration::from_millis(300);
/// Writes happen on a detached task after the response is decided.
const WRITE_DEADLINE: Duration = Duration::from_secs(1);

/// Shared reservation cache over a Redis connection manager.
#[derive(Clone)]
pub struct RedisReservationCache {
    conn: ConnectionManager,
}

impl RedisReservationCache {
    #[must_use]
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn cache_key(item_id: i64) -> String {
    format!("{KEY_PREFIX}{item_id}")
}

impl ReservationCache for RedisReservationCache {
    async fn get(&self, item_id: i64) -> Result<Option<ReservationEntry>> {
        let mut conn = self.conn.clone();
        let key = cache_key(item_id);

        let raw: Option<String> =
            tokio::time::timeout(READ_DEADLINE, conn.get::<_, Option<String>>(&key))
                .await
                .map_err(|_| Error::Internal("reservation cache read timed out".to_string()))??;

        match raw {
            Some(raw) => Ok(Some(raw.parse()?)),
            None => Ok(None),
        }
    }

    async fn put(&self, item_id: i64, entry: ReservationEntry, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = cache_key(item_id);

        tokio::time::timeout(
            WRITE_DEADLINE,
            conn.set_ex::<_, _, ()>(&key, entry.to_string(), ttl.as_secs().max(1)),
        )
        .await
        .map_err(|_| Error::Internal("reservation cache write timed out".to_string()))??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    async fn test_cache() -> RedisReservationCache {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        RedisReservationCache::new(ConnectionManager::new(client).await.unwrap())
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn put_then_get_roundtrips() {
        let cache = test_cache().await;
        let item_id = 910_001;

        let entry = ReservationEntry {
            user_id: 7,
            until: Utc::now() + chrono::Duration::minutes(3),
            code: format!("7:{item_id}:a1B2c3D4"),
        };

        cache
            .put(item_id, entry.clone(), Duration::from_secs(180))
            .await
            .unwrap();

        let got = cache.get(item_id).await.unwrap().unwrap();
        assert_eq!(got.user_id, entry.user_id);
        assert_eq!(got.code, entry.code);
        assert_eq!(got.until.timestamp(), entry.until.timestamp());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn missing_key_is_a_miss() {
        let cache = test_cache().await;
        assert!(cache.get(910_999).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn entry_expires_with_ttl() {
        let cache = test_cache().await;
        let item_id = 910_002;

        let entry = ReservationEntry {
            user_id: 7,
            until: Utc::now() + chrono::Duration::seconds(1),
            code: format!("7:{item_id}:a1B2c3D4"),
        };

        cache.put(item_id, entry, Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert!(cache.get(item_id).await.unwrap().is_none());
    }
}
