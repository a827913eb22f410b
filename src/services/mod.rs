//! The checkout engine and its capability wrappers.
//!
//! One trait, [`crate::providers::CheckoutService`], with explicit wrapper
//! types assembled once at startup, innermost first:
//!
//! ```text
//! CheckoutGeneric -> CachingCheckout (optional) -> LimitingCheckout -> LoggingCheckout
//! ```
//!
//! Each layer either short-circuits (cached verdict, exceeded quota) or
//! delegates to its inner service.

mod caching;
mod generic;
mod limiting;
mod logging;
mod sale;

pub use caching::CachingCheckout;
pub use generic::CheckoutGeneric;
pub use limiting::LimitingCheckout;
pub use logging::LoggingCheckout;
pub use sale::SaleService;
