//! In-memory audit sink for testing.

use crate::error::{Error, Result};
use crate::model::CheckoutAttempt;
use crate::providers::AuditSink;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    recorded: Vec<CheckoutAttempt>,
    fail: Option<String>,
}

/// In-memory audit sink that records every attempt it is given.
#[derive(Debug, Clone, Default)]
pub struct MockAuditSink {
    inner: Arc<Mutex<Inner>>,
}

impl MockAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All attempts recorded so far, in arrival order.
    #[must_use]
    pub fn recorded(&self) -> Vec<CheckoutAttempt> {
        self.lock().recorded.clone()
    }

    /// Make every `add` fail with an internal error.
    pub fn fail_with(&self, message: &str) {
        self.lock().fail = Some(message.to_string());
    }

    /// Clear a previously set failure.
    pub fn succeed(&self) {
        self.lock().fail = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for MockAuditSink {
    async fn add(&self, attempts: Vec<CheckoutAttempt>) -> Result<()> {
        let mut inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        inner.recorded.extend(attempts);
        Ok(())
    }
}
