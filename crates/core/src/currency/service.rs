//! Conversion service over a pluggable rate provider.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::currency::cache::RateCache;
use crate::currency::conversion::convert_amount;
use crate::currency::error::ConversionError;

/// Decimal places kept on converted amounts.
const CONVERTED_DECIMAL_PLACES: u32 = 2;

/// Source of exchange rates (HTTP API in production, fixed table in tests).
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the rate such that `amount(from) * rate = amount(to)`.
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Decimal, ConversionError>;
}

/// Result of a currency conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// The amount expressed in the target currency.
    pub converted_amount: Decimal,
    /// The rate that was applied.
    pub exchange_rate: Decimal,
}

/// Converts amounts between currencies through a cached rate provider.
///
/// Identity when the currencies match; otherwise the rate comes from the
/// cache or, on a miss, from the provider (and is then cached).
#[derive(Clone)]
pub struct ConversionService {
    provider: Arc<dyn RateProvider>,
    cache: RateCache,
}

impl ConversionService {
    /// Creates a conversion service over the given provider and cache.
    #[must_use]
    pub fn new(provider: Arc<dyn RateProvider>, cache: RateCache) -> Self {
        Self { provider, cache }
    }

    /// Converts an amount between currencies.
    ///
    /// # Errors
    ///
    /// Returns a `ConversionError` when the currency codes are invalid or
    /// no rate is obtainable. Callers must abort the mutating request
    /// rather than substitute a default rate.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ConversionError> {
        let from = validate_code(from)?;
        let to = validate_code(to)?;

        if from == to {
            return Ok(Conversion {
                converted_amount: amount,
                exchange_rate: Decimal::ONE,
            });
        }

        let rate = match self.cache.get(&from, &to).await {
            Some(rate) => rate,
            None => {
                let rate = self.provider.fetch_rate(&from, &to).await?;
                self.cache.insert(&from, &to, rate).await;
                rate
            }
        };

        Ok(Conversion {
            converted_amount: convert_amount(amount, rate, CONVERTED_DECIMAL_PLACES),
            exchange_rate: rate,
        })
    }
}

/// Validates and normalizes a 3-letter ISO 4217 currency code.
fn validate_code(code: &str) -> Result<String, ConversionError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ConversionError::InvalidCurrency(code.to_string()))
    }
}
