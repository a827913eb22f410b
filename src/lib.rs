//! Flash-sale checkout server.
//!
//! Every hour a new sale starts with a fixed set of items; concurrent users
//! race to reserve and purchase them. Three constraints hold under extreme
//! contention:
//!
//! 1. **At-most-one-owner**: each item is sold at most once.
//! 2. **Per-user quota**: at most `purchases_limit` purchases per user per
//!    sale hour.
//! 3. **Transient reservation**: a checkout grants an exclusive hold of
//!    `checkout_timeout`; only the holder may finalize within it, after
//!    which the item returns to the pool.
//!
//! # Architecture
//!
//! The serialization point is a single conditional UPDATE in `PostgreSQL`
//! ([`stores::postgres::PostgresItemStore`]); everything else is advisory.
//! A two-tier reservation cache ([`services::CachingCheckout`]) deflects
//! thundering-herd probes on contended items, a Redis counter
//! ([`stores::RedisRateLimiter`]) enforces the quota best-effort, and
//! checkout attempts are audited through a batching sink
//! ([`stores::postgres::BatchingAuditLog`]).
//!
//! Capability layers wrap the generic engine as explicit types, assembled
//! once at startup: generic → caching → limiting → logging. See
//! [`services`].

pub mod config;
pub mod error;
pub mod mocks;
pub mod model;
pub mod providers;
pub mod server;
pub mod services;
pub mod stores;

pub use config::Config;
pub use error::{Error, Result};
