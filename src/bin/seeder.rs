//! Hourly sale seeder.
//!
//! For each configured sale index, opens one transaction that inserts a sale
//! anchored at `floor(now, hour) + i * hour` and bulk-inserts its randomly
//! named items. A sale whose window already exists is skipped, so the job is
//! safe to run from cron every hour.

use anyhow::Context;
use chrono::{DateTime, Duration, DurationRound, Utc};
use flashsale::stores::postgres;
use flashsale::Config;
use rand::Rng;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rows per bulk INSERT; 5 binds each stays well under the wire limit.
const INSERT_BATCH: i64 = 1000;

// Words used for generating item names.
const ADJECTIVES: &[&str] = &[
    "Premium", "Deluxe", "Ultra", "Pro", "Smart", "Classic", "Modern", "Vintage", "Luxury",
    "Budget",
];
const CATEGORIES: &[&str] = &[
    "Electronics", "Clothing", "Books", "Home", "Sports", "Beauty", "Toys", "Food", "Health",
    "Garden",
];
const NOUNS: &[&str] = &[
    "Phone", "Laptop", "Watch", "Headphones", "Camera", "Tablet", "Speaker", "Keyboard", "Mouse",
    "Monitor",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let started = Instant::now();

    let pool = postgres::connect(&config.postgres)
        .await
        .context("can't init database")?;
    postgres::migrate(&pool).await.context("can't run migrations")?;

    generate(&pool, &config).await?;

    tracing::info!(elapsed = ?started.elapsed(), "items generated");
    Ok(())
}

async fn generate(pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    let mut anchor = Utc::now();

    for index in 0..config.sales_count {
        let start = anchor.duration_trunc(Duration::hours(1))?;
        let end = start + Duration::hours(1);

        if seed_sale(pool, config, start, end).await? {
            tracing::info!(index = index + 1, %start, "sale added");
        } else {
            tracing::warn!(%start, %end, "sale with this window already exists, skipping");
        }

        anchor += Duration::hours(1);
    }

    Ok(())
}

/// Insert one sale and its items in a single transaction. Returns `false`
/// when the window already exists and nothing was written.
async fn seed_sale(
    pool: &PgPool,
    config: &Config,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await.context("can't begin tx")?;

    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM sales WHERE start_at = $1 AND end_at = $2)",
    )
    .bind(start)
    .bind(end)
    .fetch_one(&mut *tx)
    .await
    .context("can't check if sale exists")?;

    if exists {
        return Ok(false);
    }

    let now = Utc::now();

    let (sale_id,): (i64,) = sqlx::query_as(
        "INSERT INTO sales (start_at, end_at, created_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(start)
    .bind(end)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .context("can't insert sale")?;

    let mut rng = rand::thread_rng();
    let mut inserted: i64 = 0;

    while inserted < config.items_per_sale {
        let batch = (config.items_per_sale - inserted).min(INSERT_BATCH);

        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO items (sale_id, name, created_at, sale_start, sale_end) ",
        );
        query.push_values(0..batch, |mut row, _| {
            row.push_bind(sale_id)
                .push_bind(item_name(&mut rng))
                .push_bind(now)
                .push_bind(start)
                .push_bind(end);
        });
        query
            .build()
            .execute(&mut *tx)
            .await
            .context("can't insert items")?;

        inserted += batch;
        tracing::debug!(sale_id, inserted, "inserted item batch");
    }

    tx.commit().await.context("can't commit tx")?;
    Ok(true)
}

fn item_name(rng: &mut impl Rng) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];

    format!("{adjective} {category} {noun}")
}
