//! The checkout engine interface.

use crate::error::Result;
use crate::model::{CheckoutCode, Item};
use std::future::Future;

/// Reservation-and-purchase engine.
///
/// Implemented by the generic engine and by each capability wrapper
/// ([`crate::services`]); the chain is assembled once at startup and each
/// layer either short-circuits or delegates.
pub trait CheckoutService: Send + Sync {
    /// Reserve `item_id` for `user_id`, returning the opaque checkout token.
    ///
    /// # Errors
    ///
    /// `Error::ItemUnavailable` when the item is held or the sale inactive,
    /// `Error::LimitExceeded` when the user is over quota.
    fn checkout(&self, user_id: i64, item_id: i64) -> impl Future<Output = Result<String>> + Send;

    /// Finalize the purchase authorized by `code`.
    fn purchase(&self, code: &CheckoutCode) -> impl Future<Output = Result<()>> + Send;

    /// Id-ordered page of items plus the total count.
    fn list_items(
        &self,
        page_num: i64,
        page_size: i64,
    ) -> impl Future<Output = Result<(Vec<Item>, i64)>> + Send;
}
