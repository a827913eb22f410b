//! HTTP boundary: router assembly and the serve loop.

pub mod handlers;
pub mod middleware;

pub use handlers::{ApiError, AppState};

use crate::providers::{CheckoutService, SaleStore};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::any::Any;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

/// Upper bound on any single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the complete router.
///
/// Layer order, outermost first: request logging, panic recovery, request
/// timeout. Unmatched methods on a known path yield 405.
pub fn build_router<S, P>(state: AppState<S, P>) -> Router
where
    S: CheckoutService + Clone + Send + Sync + 'static,
    P: SaleStore + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/checkout", post(handlers::checkout::<S, P>))
        .route("/purchase", post(handlers::purchase::<S, P>))
        .route("/items", get(handlers::list_items::<S, P>))
        .route("/sales", get(handlers::list_sales::<S, P>))
        .route("/health", get(handlers::health))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::custom(recover))
        .layer(middleware::RequestLogLayer)
        .with_state(state)
}

/// Serve until the shutdown signal fires, then stop accepting and drain.
///
/// The caller owns the drain bound: signal, then time out on this future.
///
/// # Errors
///
/// Returns error if accepting connections fails.
pub async fn serve<S, P>(
    listener: TcpListener,
    state: AppState<S, P>,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()>
where
    S: CheckoutService + Clone + Send + Sync + 'static,
    P: SaleStore + Clone + Send + Sync + 'static,
{
    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

/// Translate an uncaught panic into a 500 and log the stack trace.
fn recover(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    tracing::error!(
        panic = %detail,
        stacktrace = %std::backtrace::Backtrace::force_capture(),
        "panic caught"
    );

    handlers::internal_error_response()
}
