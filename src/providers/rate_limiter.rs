//! Per-user purchase quota.

use crate::error::Result;
use std::future::Future;

/// Sliding hourly purchase counter keyed by user.
///
/// The comparison lives on the counter side (`exceeded`, not a raw count) so
/// callers hold no limit state. Increments happen after purchase success;
/// transient over-count under concurrency is documented slack, not a defect.
pub trait RateLimiter: Send + Sync {
    /// Whether `user_id` has spent their quota for the current sale hour.
    fn exceeded(&self, user_id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Bump the user's counter for the current sale hour, returning the new
    /// count. The first bump of an hour also arms a one-hour expiry.
    fn increment(&self, user_id: i64) -> impl Future<Output = Result<i64>> + Send;
}
