//! Backend implementations of the provider traits.
//!
//! `PostgreSQL` is the authoritative store; Redis carries the advisory
//! reservation tier and the per-user quota counters.

pub mod postgres;

mod rate_limiter_redis;
mod reservation_redis;

pub use rate_limiter_redis::RedisRateLimiter;
pub use reservation_redis::RedisReservationCache;

use crate::config::RedisConfig;
use crate::error::Result;
use redis::aio::ConnectionManager;
use redis::Client;

/// Open a Redis connection manager from configuration.
///
/// The manager multiplexes one connection and reconnects on failure; clones
/// are cheap and share it.
///
/// # Errors
///
/// Returns error if the client cannot be created or the initial connection
/// fails.
pub async fn connect_redis(config: &RedisConfig) -> Result<ConnectionManager> {
    let client = Client::open(config.url())?;
    let conn = ConnectionManager::new(client).await?;
    Ok(conn)
}
