//! Currency conversion for expense amounts.
//!
//! Every expense is normalized into its company's reporting currency at
//! creation/edit time; threshold matching and aggregation happen on the
//! converted amount. Rates come from an injected provider behind a
//! 24-hour TTL cache.

pub mod cache;
pub mod conversion;
pub mod error;
pub mod service;

pub use cache::RateCache;
pub use conversion::convert_amount;
pub use error::ConversionError;
pub use service::{Conversion, ConversionService, RateProvider};
