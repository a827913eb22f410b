//! Core checkout logic: nonce generation, the store CAS, and audit enqueue.

use crate::error::Result;
use crate::model::{CheckoutAttempt, CheckoutCode, Item};
use crate::providers::{AuditSink, CheckoutService, ItemStore};
use std::time::Duration;

/// The innermost engine. Everything above it is a capability wrapper.
///
/// Audit rows are written outside the reservation transaction, through the
/// sink, and only for terminal checkout verdicts: success (with the code) or
/// explicit unavailability (with the error text). Transport-level failures
/// are not attempts and stay out of the audit trail.
#[derive(Clone)]
pub struct CheckoutGeneric<I, A> {
    items: I,
    audit: A,
    checkout_timeout: Duration,
}

impl<I, A> CheckoutGeneric<I, A> {
    pub const fn new(items: I, audit: A, checkout_timeout: Duration) -> Self {
        Self {
            items,
            audit,
            checkout_timeout,
        }
    }
}

impl<I, A> CheckoutService for CheckoutGeneric<I, A>
where
    I: ItemStore,
    A: AuditSink,
{
    async fn checkout(&self, user_id: i64, item_id: i64) -> Result<String> {
        let code = CheckoutCode::generate(user_id, item_id);
        let token = code.to_string();

        let result = self
            .items
            .reserve(user_id, item_id, &code.rand, self.checkout_timeout)
            .await;

        let attempt = match &result {
            Ok(()) => Some(CheckoutAttempt::succeeded(user_id, item_id, token.clone())),
            Err(e) if e.is_checkout_verdict() => {
                Some(CheckoutAttempt::failed(user_id, item_id, e.to_string()))
            }
            Err(_) => None,
        };

        if let Some(attempt) = attempt {
            if let Err(e) = self.audit.add(vec![attempt]).await {
                tracing::error!(error = %e, "can't save checkout attempt");
            }
        }

        result.map(|()| token)
    }

    async fn purchase(&self, code: &CheckoutCode) -> Result<()> {
        self.items.purchase(code).await
    }

    async fn list_items(&self, page_num: i64, page_size: i64) -> Result<(Vec<Item>, i64)> {
        self.items.list_page(page_num, page_size).await
    }
}
