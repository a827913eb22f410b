//! In-memory item store for testing.

use crate::error::{Error, Result};
use crate::model::{CheckoutCode, Item};
use crate::providers::ItemStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockItem {
    sale_id: i64,
    name: String,
    created_at: DateTime<Utc>,
    sale_start: DateTime<Utc>,
    sale_end: DateTime<Utc>,
    sold: bool,
    reserved_by: Option<i64>,
    reserved_until: Option<DateTime<Utc>>,
    code: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    items: BTreeMap<i64, MockItem>,
    reserve_calls: usize,
    fail: Option<String>,
}

/// In-memory item store applying the same row predicates as the real one,
/// serialized by a single mutex, so concurrent reservation races resolve to
/// exactly one winner here too.
#[derive(Debug, Clone, Default)]
pub struct MockItemStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockItemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item whose sale window is open at `now`.
    pub fn insert_live_item(&self, item_id: i64, now: DateTime<Utc>) {
        self.insert_item(
            item_id,
            now - chrono::Duration::minutes(5),
            now + chrono::Duration::hours(1),
        );
    }

    /// Insert an item with full control over the sale window.
    pub fn insert_item(&self, item_id: i64, sale_start: DateTime<Utc>, sale_end: DateTime<Utc>) {
        let mut inner = self.lock();
        inner.items.insert(
            item_id,
            MockItem {
                sale_id: 1,
                name: format!("Test Widget {item_id}"),
                created_at: Utc::now(),
                sale_start,
                sale_end,
                sold: false,
                reserved_by: None,
                reserved_until: None,
                code: None,
            },
        );
    }

    /// Make every store call fail with an internal error.
    pub fn fail_with(&self, message: &str) {
        self.lock().fail = Some(message.to_string());
    }

    /// Number of `reserve` calls that reached the store.
    #[must_use]
    pub fn reserve_calls(&self) -> usize {
        self.lock().reserve_calls
    }

    /// Whether the item has been sold.
    #[must_use]
    pub fn sold(&self, item_id: i64) -> bool {
        self.lock().items.get(&item_id).is_some_and(|i| i.sold)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ItemStore for MockItemStore {
    async fn reserve(&self, user_id: i64, item_id: i64, nonce: &str, hold: Duration) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }
        inner.reserve_calls += 1;

        let Some(item) = inner.items.get_mut(&item_id) else {
            return Err(Error::ItemUnavailable);
        };

        let reservable = !item.sold
            && item.sale_start < now
            && item.sale_end > now
            && item.reserved_until.is_none_or(|until| until < now);

        if !reservable {
            return Err(Error::ItemUnavailable);
        }

        item.reserved_by = Some(user_id);
        item.reserved_until = chrono::Duration::from_std(hold).ok().map(|hold| now + hold);
        item.code = Some(nonce.to_string());

        Ok(())
    }

    async fn purchase(&self, code: &CheckoutCode) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        let Some(item) = inner.items.get_mut(&code.item_id) else {
            return Err(Error::NotFound);
        };

        let purchasable = !item.sold
            && item.reserved_by == Some(code.user_id)
            && item.code.as_deref() == Some(code.rand.as_str())
            && item.reserved_until.is_some_and(|until| until > now)
            && item.sale_start < now
            && item.sale_end > now;

        if !purchasable {
            return Err(Error::NotFound);
        }

        item.sold = true;
        Ok(())
    }

    async fn list_page(&self, page_num: i64, page_size: i64) -> Result<(Vec<Item>, i64)> {
        let inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        let total = inner.items.len() as i64;
        let offset = ((page_num - 1) * page_size).max(0) as usize;

        let items = inner
            .items
            .iter()
            .skip(offset)
            .take(page_size.max(0) as usize)
            .map(|(&id, item)| Item {
                id,
                sale_id: item.sale_id,
                name: item.name.clone(),
                sold: item.sold,
                created_at: item.created_at,
            })
            .collect();

        Ok((items, total))
    }
}
