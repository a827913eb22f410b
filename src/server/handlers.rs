//! Request handlers and the error-to-status mapping.

use crate::error::Error;
use crate::model::{CheckoutCode, Item, Sale};
use crate::providers::{CheckoutService, SaleStore};
use crate::services::SaleService;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadline for the checkout hot path; propagates into every downstream call.
const CHECKOUT_DEADLINE: Duration = Duration::from_secs(1);

const DEFAULT_PAGE_NUM: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 100;

/// Shared state handed to every handler; cloned per request.
pub struct AppState<S, P> {
    pub items: S,
    pub sales: SaleService<P>,
}

impl<S, P> Clone for AppState<S, P>
where
    S: Clone,
    P: Clone,
{
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            sales: self.sales.clone(),
        }
    }
}

/// HTTP-facing error: a status plus a one-line `text/plain` body.
///
/// Wrapped causes are logged, never sent; clients get the short summary only.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    source: Option<Error>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::ItemUnavailable => Self::new(
                StatusCode::CONFLICT,
                "item is unavailable for checkout: either it's already checked out or the sale is not active",
            ),
            Error::LimitExceeded => Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string()),
            Error::NotFound => Self::new(StatusCode::NOT_FOUND, "no checkout for the given code"),
            Error::MalformedCode(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(_) | Error::Cache(_) | Error::Internal(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal error".to_string(),
                source: Some(err),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => {
                    tracing::error!(status = %self.status, error = %source, "request failed");
                }
                None => tracing::error!(status = %self.status, "request failed"),
            }
        }

        (self.status, self.message).into_response()
    }
}

/// 500 response used by the panic-recovery layer.
#[must_use]
pub fn internal_error_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CheckoutParams {
    user_id: i64,
    item_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    code: String,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseParams {
    code: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page_num: Option<i64>,
    page_size: Option<i64>,
}

/// Listing envelope shared by `/items` and `/sales`.
#[derive(Debug, Serialize)]
pub struct ListPageResponse<T> {
    page: Vec<T>,
    total: i64,
}

/// `POST /checkout?user_id=&item_id=`
pub async fn checkout<S, P>(
    State(state): State<AppState<S, P>>,
    Query(params): Query<CheckoutParams>,
) -> Result<Json<CheckoutResponse>, ApiError>
where
    S: CheckoutService,
    P: SaleStore,
{
    if params.user_id <= 0 {
        return Err(ApiError::bad_request(format!(
            "invalid user_id: {}",
            params.user_id
        )));
    }
    if params.item_id <= 0 {
        return Err(ApiError::bad_request(format!(
            "invalid item_id: {}",
            params.item_id
        )));
    }

    let code = tokio::time::timeout(
        CHECKOUT_DEADLINE,
        state.items.checkout(params.user_id, params.item_id),
    )
    .await
    .map_err(|_| Error::Internal("checkout deadline exceeded".to_string()))??;

    Ok(Json(CheckoutResponse { code }))
}

/// `POST /purchase?code=`
pub async fn purchase<S, P>(
    State(state): State<AppState<S, P>>,
    Query(params): Query<PurchaseParams>,
) -> Result<StatusCode, ApiError>
where
    S: CheckoutService,
    P: SaleStore,
{
    let code: CheckoutCode = params.code.parse()?;

    state.items.purchase(&code).await?;

    Ok(StatusCode::OK)
}

/// `GET /items?page_num=&page_size=`
pub async fn list_items<S, P>(
    State(state): State<AppState<S, P>>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListPageResponse<Item>>, ApiError>
where
    S: CheckoutService,
    P: SaleStore,
{
    let page_num = params.page_num.unwrap_or(DEFAULT_PAGE_NUM).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let (page, total) = state.items.list_items(page_num, page_size).await?;

    Ok(Json(ListPageResponse { page, total }))
}

/// `GET /sales?page_num=&page_size=`
pub async fn list_sales<S, P>(
    State(state): State<AppState<S, P>>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListPageResponse<Sale>>, ApiError>
where
    S: CheckoutService,
    P: SaleStore,
{
    let page_num = params.page_num.unwrap_or(DEFAULT_PAGE_NUM).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let (page, total) = state.sales.list_page(page_num, page_size).await?;

    Ok(Json(ListPageResponse { page, total }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `GET /health` liveness probe; does not touch dependencies.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
