//! In-memory shared reservation cache for testing.

use crate::error::{Error, Result};
use crate::model::ReservationEntry;
use crate::providers::ReservationCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<i64, ReservationEntry>,
    fail: Option<String>,
}

/// In-memory reservation cache. TTLs are not modeled: entries carry their
/// own expiry and callers check liveness, same as against Redis.
#[derive(Debug, Clone, Default)]
pub struct MockReservationCache {
    inner: Arc<Mutex<Inner>>,
}

impl MockReservationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry, as if a sibling process had written it.
    pub fn seed(&self, item_id: i64, entry: ReservationEntry) {
        self.lock().entries.insert(item_id, entry);
    }

    /// Entry currently stored for `item_id`, if any.
    #[must_use]
    pub fn stored(&self, item_id: i64) -> Option<ReservationEntry> {
        self.lock().entries.get(&item_id).cloned()
    }

    /// Make every cache call fail with an internal error.
    pub fn fail_with(&self, message: &str) {
        self.lock().fail = Some(message.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReservationCache for MockReservationCache {
    async fn get(&self, item_id: i64) -> Result<Option<ReservationEntry>> {
        let inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        Ok(inner.entries.get(&item_id).cloned())
    }

    async fn put(&self, item_id: i64, entry: ReservationEntry, _ttl: Duration) -> Result<()> {
        let mut inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        inner.entries.insert(item_id, entry);
        Ok(())
    }
}
