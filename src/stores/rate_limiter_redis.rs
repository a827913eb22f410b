//! Redis-backed per-user purchase limiter.
//!
//! One integer counter per user per sale hour, keyed as
//! `limiter:{userID}:{hourEpoch}` with a one-hour TTL. A plain counter is
//! enough here: the window is the sale hour itself, so there is nothing to
//! slide.

use crate::error::{Error, Result};
use crate::providers::RateLimiter;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

const KEY_PREFIX: &str = "limiter:";

const REDIS_DEADLINE: Duration = Duration::from_millis(300);

/// Rate limiter over a Redis connection manager.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    limit: i64,
}

impl RedisRateLimiter {
    #[must_use]
    pub const fn new(conn: ConnectionManager, limit: i64) -> Self {
        Self { conn, limit }
    }
}

/// Counter key for the sale hour containing `now`.
///
/// The hour floor of the timestamp is the start of the sale window, so one
/// key spans exactly one sale.
fn counter_key(user_id: i64, now: DateTime<Utc>) -> String {
    let hour = now.timestamp() - now.timestamp().rem_euclid(3600);
    format!("{KEY_PREFIX}{user_id}:{hour}")
}

impl RateLimiter for RedisRateLimiter {
    async fn exceeded(&self, user_id: i64) -> Result<bool> {
        let mut conn = self.conn.clone();
        let key = counter_key(user_id, Utc::now());

        let count: Option<i64> =
            tokio::time::timeout(REDIS_DEADLINE, conn.get::<_, Option<i64>>(&key))
                .await
                .map_err(|_| Error::Internal("limiter read timed out".to_string()))??;

        Ok(count.is_some_and(|c| c >= self.limit))
    }

    async fn increment(&self, user_id: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let key = counter_key(user_id, Utc::now());

        let count: i64 = tokio::time::timeout(REDIS_DEADLINE, conn.incr(&key, 1_i64))
            .await
            .map_err(|_| Error::Internal("limiter increment timed out".to_string()))??;

        if count == 1 {
            tokio::time::timeout(REDIS_DEADLINE, conn.expire::<_, ()>(&key, 3600))
                .await
                .map_err(|_| Error::Internal("limiter expire timed out".to_string()))??;
        }

        Ok(count)
    }
}
