//! Error types for checkout and purchase operations.

use thiserror::Error;

/// Result type alias for checkout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the checkout engine.
///
/// Every store and cache failure collapses into one of these kinds; the HTTP
/// layer owns the mapping to status codes. Causal chains are preserved for
/// logs and never appear in response bodies beyond a one-line summary.
#[derive(Debug, Error)]
pub enum Error {
    /// Item is sold, outside its sale window, or held by another user.
    #[error("item is unavailable for checkout")]
    ItemUnavailable,

    /// User is over the per-sale purchase quota.
    #[error("user exceeded the purchase limit")]
    LimitExceeded,

    /// Purchase target is not reservable by this token.
    #[error("no checkout for the given code")]
    NotFound,

    /// Checkout code failed to parse.
    #[error("malformed checkout code: {0}")]
    MalformedCode(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Shared cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Anything else that must surface as a server-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` for terminal checkout verdicts, the only outcomes worth
    /// an audit row. Transport-level noise is kept out of the audit trail.
    pub const fn is_checkout_verdict(&self) -> bool {
        matches!(self, Self::ItemUnavailable)
    }
}
