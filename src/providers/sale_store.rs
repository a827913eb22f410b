//! Read-only sale listing.

use crate::error::Result;
use crate::model::Sale;
use std::future::Future;

/// Paged access to sale windows.
pub trait SaleStore: Send + Sync {
    /// Most-recent-first page of sales plus the total count.
    fn list_page(
        &self,
        page_num: i64,
        page_size: i64,
    ) -> impl Future<Output = Result<(Vec<Sale>, i64)>> + Send;
}
