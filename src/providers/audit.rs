//! Checkout attempt audit trail.

use crate::error::Result;
use crate::model::CheckoutAttempt;
use std::future::Future;

/// Append-only sink for checkout attempts.
///
/// Audit is best-effort by design: the batching implementation buffers in
/// memory and can drop records on sustained database unavailability. Nothing
/// on the hot path waits for disk.
pub trait AuditSink: Send + Sync {
    /// Record the given attempts.
    fn add(&self, attempts: Vec<CheckoutAttempt>) -> impl Future<Output = Result<()>> + Send;
}
