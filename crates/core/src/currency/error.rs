//! Currency conversion error types.

use thiserror::Error;

/// Errors that can occur during currency conversion.
///
/// A conversion failure aborts the whole mutating request; the expense is
/// never created or edited with a substituted rate.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// No rate is obtainable for the currency pair.
    #[error("No exchange rate available for {from}/{to}")]
    RateUnavailable {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// The rate provider failed (network error, timeout, bad payload).
    #[error("Exchange rate provider error: {0}")]
    Provider(String),

    /// A currency code is not a 3-letter ISO 4217 code.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}
