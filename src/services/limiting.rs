//! Per-user quota enforcement around a [`CheckoutService`].

use crate::error::{Error, Result};
use crate::model::{CheckoutCode, Item};
use crate::providers::{CheckoutService, RateLimiter};

/// Rejects checkouts from users over their per-sale purchase quota.
///
/// The probe happens before checkout; the increment happens after purchase
/// success, best-effort. When the limiter itself fails the behavior depends
/// on `fail_open`: set, the request is admitted and the failure logged;
/// unset, the failure surfaces.
#[derive(Clone)]
pub struct LimitingCheckout<S, L> {
    inner: S,
    limiter: L,
    fail_open: bool,
}

impl<S, L> LimitingCheckout<S, L> {
    pub const fn new(inner: S, limiter: L, fail_open: bool) -> Self {
        Self {
            inner,
            limiter,
            fail_open,
        }
    }
}

impl<S, L> CheckoutService for LimitingCheckout<S, L>
where
    S: CheckoutService,
    L: RateLimiter,
{
    async fn checkout(&self, user_id: i64, item_id: i64) -> Result<String> {
        match self.limiter.exceeded(user_id).await {
            Ok(true) => return Err(Error::LimitExceeded),
            Ok(false) => {}
            Err(e) if self.fail_open => {
                tracing::error!(error = %e, user_id, "can't check purchase limit, admitting");
            }
            Err(e) => return Err(e),
        }

        self.inner.checkout(user_id, item_id).await
    }

    async fn purchase(&self, code: &CheckoutCode) -> Result<()> {
        self.inner.purchase(code).await?;

        if let Err(e) = self.limiter.increment(code.user_id).await {
            tracing::error!(error = %e, user_id = code.user_id, "can't increment purchase count");
        }

        Ok(())
    }

    async fn list_items(&self, page_num: i64, page_size: i64) -> Result<(Vec<Item>, i64)> {
        self.inner.list_items(page_num, page_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockAuditSink, MockItemStore, MockRateLimiter};
    use crate::services::CheckoutGeneric;
    use chrono::Utc;
    use std::time::Duration;

    fn engine(
        limit: i64,
        fail_open: bool,
    ) -> (
        LimitingCheckout<CheckoutGeneric<MockItemStore, MockAuditSink>, MockRateLimiter>,
        MockItemStore,
        MockRateLimiter,
    ) {
        let store = MockItemStore::new();
        let limiter = MockRateLimiter::new(limit);
        let generic =
            CheckoutGeneric::new(store.clone(), MockAuditSink::new(), Duration::from_secs(180));
        let limiting = LimitingCheckout::new(generic, limiter.clone(), fail_open);
        (limiting, store, limiter)
    }

    #[tokio::test]
    async fn over_quota_rejects_before_the_store() {
        let (engine, store, limiter) = engine(2, false);
        store.insert_live_item(1, Utc::now());
        limiter.set_count(7, 2); // quota of 2 fully spent

        let err = engine.checkout(7, 1).await.unwrap_err();
        assert!(matches!(err, Error::LimitExceeded));
        assert_eq!(store.reserve_calls(), 0);
    }

    #[tokio::test]
    async fn purchase_success_increments_counter() {
        let (engine, store, limiter) = engine(10, false);
        store.insert_live_item(1, Utc::now());

        let token = engine.checkout(7, 1).await.unwrap();
        let code: CheckoutCode = token.parse().unwrap();
        engine.purchase(&code).await.unwrap();

        assert_eq!(limiter.count(7), 1);
    }

    #[tokio::test]
    async fn failed_purchase_does_not_increment() {
        let (engine, _store, limiter) = engine(10, false);

        let code = CheckoutCode::generate(7, 1);
        engine.purchase(&code).await.unwrap_err();

        assert_eq!(limiter.count(7), 0);
    }

    #[tokio::test]
    async fn limiter_failure_fail_open_admits() {
        let (engine, store, limiter) = engine(10, true);
        store.insert_live_item(1, Utc::now());
        limiter.fail_with("limiter down");

        engine.checkout(7, 1).await.unwrap();
        assert_eq!(store.reserve_calls(), 1);
    }

    #[tokio::test]
    async fn limiter_failure_fail_closed_surfaces() {
        let (engine, store, limiter) = engine(10, false);
        store.insert_live_item(1, Utc::now());
        limiter.fail_with("limiter down");

        let err = engine.checkout(7, 1).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(store.reserve_calls(), 0);
    }

    #[tokio::test]
    async fn increment_failure_does_not_fail_purchase() {
        let (engine, store, limiter) = engine(10, false);
        store.insert_live_item(1, Utc::now());

        let token = engine.checkout(7, 1).await.unwrap();
        let code: CheckoutCode = token.parse().unwrap();

        limiter.fail_with("limiter down");
        engine.purchase(&code).await.unwrap();
    }
}
