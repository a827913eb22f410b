//! Flash-sale checkout server.
//!
//! Wires the store, cache, limiter, and audit sink into the capability
//! chain and serves the HTTP API until SIGTERM or ctrl-c, then drains
//! in-flight requests (15s bound) and flushes the audit buffer.

use anyhow::Context;
use flashsale::providers::CheckoutService;
use flashsale::server::{self, AppState};
use flashsale::services::{
    CachingCheckout, CheckoutGeneric, LimitingCheckout, LoggingCheckout, SaleService,
};
use flashsale::stores::postgres::{
    self, BatchingAuditLog, PostgresAuditLog, PostgresItemStore, PostgresSaleStore,
};
use flashsale::stores::{self, RedisRateLimiter, RedisReservationCache};
use flashsale::Config;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long in-flight requests get to finish after the shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_tracing(&config.log_level);

    let pool = postgres::connect(&config.postgres)
        .await
        .context("can't init database")?;
    postgres::migrate(&pool).await.context("can't run migrations")?;

    let redis = stores::connect_redis(&config.redis)
        .await
        .context("can't init redis")?;

    let (shutdown_tx, _) = broadcast::channel(8);

    let audit = BatchingAuditLog::new(
        PostgresAuditLog::new(pool.clone()),
        config.checkouts_batch_size,
        config.checkouts_flush_interval,
        shutdown_tx.subscribe(),
    );
    let generic = CheckoutGeneric::new(
        PostgresItemStore::new(pool.clone()),
        audit.clone(),
        config.checkout_timeout,
    );
    let limiter = RedisRateLimiter::new(redis.clone(), config.purchases_limit);
    let sales = SaleService::new(PostgresSaleStore::new(pool));

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("can't bind {}", config.listen_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

    let server = if config.cache_checkouts {
        let caching = CachingCheckout::new(
            generic,
            RedisReservationCache::new(redis),
            config.checkout_timeout,
            shutdown_tx.subscribe(),
        );
        let service =
            LoggingCheckout::new(LimitingCheckout::new(caching, limiter, config.limiter_fail_open));
        spawn_server(listener, service, sales, shutdown_tx.subscribe())
    } else {
        let service =
            LoggingCheckout::new(LimitingCheckout::new(generic, limiter, config.limiter_fail_open));
        spawn_server(listener, service, sales, shutdown_tx.subscribe())
    };

    wait_for_signal().await;
    tracing::info!("shutting down");

    let _ = shutdown_tx.send(());

    match tokio::time::timeout(GRACEFUL_TIMEOUT, server).await {
        Ok(joined) => joined
            .context("server task panicked")?
            .context("server error")?,
        Err(_) => tracing::warn!("graceful shutdown timed out, dropping in-flight requests"),
    }

    // The flusher drains on the signal too; waiting here guarantees the
    // drain happened before the pool goes away.
    audit.flush().await;

    Ok(())
}

fn spawn_server<S>(
    listener: TcpListener,
    service: S,
    sales: SaleService<PostgresSaleStore>,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<std::io::Result<()>>
where
    S: CheckoutService + Clone + Send + Sync + 'static,
{
    let state = AppState {
        items: service,
        sales,
    };
    tokio::spawn(server::serve(listener, state, shutdown))
}

fn init_tracing(level: &str) {
    let directive = match level {
        "INFO" => "info",
        "WARN" | "WARNING" => "warn",
        "ERROR" => "error",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{directive},sqlx=warn").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "can't install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "can't install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
