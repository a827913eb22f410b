//! In-memory sale store for testing.

use crate::error::{Error, Result};
use crate::model::Sale;
use crate::providers::SaleStore;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    sales: Vec<Sale>,
    fail: Option<String>,
}

/// In-memory sale store; sales are listed most-recently-created first.
#[derive(Debug, Clone, Default)]
pub struct MockSaleStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockSaleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sale(&self, sale: Sale) {
        self.lock().sales.push(sale);
    }

    /// Make every store call fail with an internal error.
    pub fn fail_with(&self, message: &str) {
        self.lock().fail = Some(message.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SaleStore for MockSaleStore {
    async fn list_page(&self, page_num: i64, page_size: i64) -> Result<(Vec<Sale>, i64)> {
        let inner = self.lock();

        if let Some(message) = &inner.fail {
            return Err(Error::Internal(message.clone()));
        }

        let total = inner.sales.len() as i64;

        let mut sales = inner.sales.clone();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = ((page_num - 1) * page_size).max(0) as usize;
        let page = sales
            .into_iter()
            .skip(offset)
            .take(page_size.max(0) as usize)
            .collect();

        Ok((page, total))
    }
}
