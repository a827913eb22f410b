//! Sale listing backed by `PostgreSQL`.

use crate::error::Result;
use crate::model::Sale;
use crate::providers::SaleStore;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Read-only sale store.
#[derive(Clone)]
pub struct PostgresSaleStore {
    pool: PgPool,
}

impl PostgresSaleStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SaleStore for PostgresSaleStore {
    async fn list_page(&self, page_num: i64, page_size: i64) -> Result<(Vec<Sale>, i64)> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        let offset = (page_num - 1) * page_size;

        let rows: Vec<(i64, DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, created_at, start_at, end_at
             FROM sales
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let sales = rows
            .into_iter()
            .map(|(id, created_at, start_at, end_at)| Sale {
                id,
                start_at,
                end_at,
                created_at,
            })
            .collect();

        Ok((sales, total))
    }
}
