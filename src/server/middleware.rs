//! Request logging middleware.
//!
//! A `tower` `Layer`/`Service` pair that records method, URI, status,
//! response bytes, and latency for every request at debug level.

use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Layer that adds request logging to all routes.
#[derive(Clone, Debug)]
pub struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogMiddleware { inner }
    }
}

/// Middleware service for request logging.
#[derive(Clone, Debug)]
pub struct RequestLogMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for RequestLogMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let started = Instant::now();

        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;

            let bytes = response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);

            tracing::debug!(
                method = %method,
                uri = %uri,
                status = response.status().as_u16(),
                bytes,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request served"
            );

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn passes_requests_through() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(RequestLogLayer);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), 200);
    }
}
