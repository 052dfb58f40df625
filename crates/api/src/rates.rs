//! HTTP exchange-rate provider.
//!
//! Fetches latest rates from an external API of the
//! `/v4/latest/{base}` shape. Conversion fails closed: a timeout,
//! non-success status, or missing rate surfaces as an error rather than
//! a guessed rate.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use expensio_core::currency::{ConversionError, RateProvider};
use expensio_shared::config::RatesConfig;

/// Response payload from the exchange rate API.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    /// Quote currency -> rate, relative to the requested base.
    rates: HashMap<String, Decimal>,
}

/// Exchange-rate provider backed by an HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRateProvider {
    /// Creates a provider from the rates configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &RatesConfig) -> Result<Self, ConversionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConversionError::Provider(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Decimal, ConversionError> {
        let url = format!("{}/{}", self.api_url, from);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(from, to, error = %e, "Exchange rate request failed");
            ConversionError::Provider(e.to_string())
        })?;

        if !response.status().is_success() {
            warn!(from, to, status = %response.status(), "Exchange rate API returned error");
            return Err(ConversionError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let payload: RatesResponse = response
            .json()
            .await
            .map_err(|e| ConversionError::Provider(e.to_string()))?;

        payload
            .rates
            .get(to)
            .copied()
            .ok_or_else(|| ConversionError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}
