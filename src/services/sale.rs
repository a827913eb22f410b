//! Read-only sale listing service.

use crate::error::Result;
use crate::model::Sale;
use crate::providers::SaleStore;

/// Thin listing facade over a [`SaleStore`].
#[derive(Clone)]
pub struct SaleService<S> {
    store: S,
}

impl<S> SaleService<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> SaleService<S>
where
    S: SaleStore,
{
    pub async fn list_page(&self, page_num: i64, page_size: i64) -> Result<(Vec<Sale>, i64)> {
        self.store.list_page(page_num, page_size).await
    }
}
