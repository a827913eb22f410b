//! Latency and outcome logging around a [`CheckoutService`].

use crate::error::Result;
use crate::model::{CheckoutCode, Item};
use crate::providers::CheckoutService;
use std::time::Instant;

/// Outermost wrapper: records user, item, and latency for every call.
/// Tokens are never logged.
#[derive(Clone)]
pub struct LoggingCheckout<S> {
    inner: S,
}

impl<S> LoggingCheckout<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> CheckoutService for LoggingCheckout<S>
where
    S: CheckoutService,
{
    async fn checkout(&self, user_id: i64, item_id: i64) -> Result<String> {
        let started = Instant::now();
        let result = self.inner.checkout(user_id, item_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::debug!(user_id, item_id, elapsed_ms, "item checked out"),
            Err(e) => {
                tracing::error!(user_id, item_id, elapsed_ms, error = %e, "failed to checkout item");
            }
        }

        result
    }

    async fn purchase(&self, code: &CheckoutCode) -> Result<()> {
        let started = Instant::now();
        let result = self.inner.purchase(code).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::debug!(
                user_id = code.user_id,
                item_id = code.item_id,
                elapsed_ms,
                "item purchased"
            ),
            Err(e) => tracing::error!(
                user_id = code.user_id,
                item_id = code.item_id,
                elapsed_ms,
                error = %e,
                "failed to purchase item"
            ),
        }

        result
    }

    async fn list_items(&self, page_num: i64, page_size: i64) -> Result<(Vec<Item>, i64)> {
        self.inner.list_items(page_num, page_size).await
    }
}
