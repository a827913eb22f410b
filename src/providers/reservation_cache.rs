//! Shared reservation cache tier.

use crate::error::Result;
use crate::model::ReservationEntry;
use std::future::Future;
use std::time::Duration;

/// Shared (cross-process) view of `item -> (holder, expiry, token)`.
///
/// Advisory only: the store stays authoritative, and a stale entry at worst
/// costs one conclusive store round-trip. Implementations carry their own
/// deadlines; callers treat any error as a miss.
pub trait ReservationCache: Send + Sync {
    /// Current entry for `item_id`, if any. May return an expired entry;
    /// liveness is the caller's check.
    fn get(&self, item_id: i64) -> impl Future<Output = Result<Option<ReservationEntry>>> + Send;

    /// Store `entry` under `item_id` with the given TTL.
    fn put(
        &self,
        item_id: i64,
        entry: ReservationEntry,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;
}
