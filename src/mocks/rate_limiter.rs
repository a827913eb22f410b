//! In-memory rate limiter for testing.

use crate::error::{Error, Result};
use crate::providers::RateLimiter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    counts: HashMap<i64, i64>,
    fail: Option<String>,
}

/// In-memory purchase counter with the same `count >= limit` predicate as
/// the Redis limiter. The hour window is not modeled; tests own the clock.
#[derive(Debug, Clone)]
pub struct MockRateLimiter {
    limit: i64,
    inner: Arc<Mutex<Inner>>,
}

impl MockRateLimiter {
    #[must_use]
    pub fn new(limit: i64) -> Self {
        Self {
            limit,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Current count for a user.
    #[must_use]
    pub fn count(&self, user_id: i64) -> i64 {
        self.lock().counts.get(&user_id).copied().unwrap_or(0)
    }

    /// Set a user's count directly.
    pub fn set_count(&self, user_id: i64, count: i64) {
        self.lock().counts.insert(user_id, count);
    }

    /// Make every limiter call fail with an internal error.
    pub fn fail_with(&self, message: &str) {
        self.lock().fail = Some(message.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RateLimiter for MockRateLimiter {
    async fn exceeded(&self, user_id: i64) -> Result<bool> {
        let inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        Ok(inner
            .counts
            .get(&user_id)
            .is_some_and(|&count| count >= self.limit))
    }

    async fn increment(&self, user_id: i64) -> Result<i64> {
        let mut inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        let count = inner.counts.entry(user_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
