//! Authoritative item store.

use crate::error::Result;
use crate::model::{CheckoutCode, Item};
use std::future::Future;
use std::time::Duration;

/// Durable item/sale state with compare-and-set reservation semantics.
///
/// The store is the single serialization point: any interleaving of
/// `reserve` and `purchase` against one item is linearizable from its
/// viewpoint, without application-level locks.
pub trait ItemStore: Send + Sync {
    /// Reserve `item_id` for `user_id` for the `hold` duration.
    ///
    /// Succeeds iff the item is not sold, its sale window is open, and no
    /// other reservation is live. Not idempotent: repeat checkout by the
    /// holder is the cache layer's job to detect.
    ///
    /// # Errors
    ///
    /// `Error::ItemUnavailable` when the conditional update matches no row.
    fn reserve(
        &self,
        user_id: i64,
        item_id: i64,
        nonce: &str,
        hold: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Finalize a purchase authorized by `code`.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no row matches: wrong user, stale nonce,
    /// expired reservation, expired sale, or already sold. The caller cannot
    /// distinguish these, so neither does the store.
    fn purchase(&self, code: &CheckoutCode) -> impl Future<Output = Result<()>> + Send;

    /// Id-ordered page of items plus the total count.
    fn list_page(
        &self,
        page_num: i64,
        page_size: i64,
    ) -> impl Future<Output = Result<(Vec<Item>, i64)>> + Send;
}
