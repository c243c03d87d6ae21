use log::{info, warn};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::CurrencyConfig;

/// Currency conversion errors. A rate-limited or unexpected response means
/// "no rate available" — it must block the transfer, never default to 1.
#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("currency API rate limit reached")]
    RateLimited,

    #[error("unexpected response status {0} from currency API")]
    UnexpectedStatus(u16),

    #[error("currency request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no rate for currency {0} in response")]
    MissingRate(String),
}

/// Source of exchange rates between two currency codes.
#[cfg_attr(test, mockall::automock)]
pub trait RateSource {
    /// Fetch the rate that converts one unit of `base` into `target`.
    fn fetch_rate(&self, base: &str, target: &str) -> Result<Decimal, CurrencyError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    data: HashMap<String, Decimal>,
}

/// HTTP client for the external currency-rate API.
pub struct CurrencyApi {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
}

impl CurrencyApi {
    pub fn new(config: &CurrencyConfig) -> Result<Self, CurrencyError> {
        let api_key = config.resolve_api_key().unwrap_or_else(|| {
            warn!("no currency API key configured; rate lookups will be rejected");
            String::new()
        });
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            api_key,
        })
    }
}

impl RateSource for CurrencyApi {
    fn fetch_rate(&self, base: &str, target: &str) -> Result<Decimal, CurrencyError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("currencies", target),
                ("base_currency", base),
            ])
            .send()?;

        match response.status() {
            StatusCode::OK => {
                let body: RatesResponse = response.json()?;
                let rate = body
                    .data
                    .get(target)
                    .copied()
                    .ok_or_else(|| CurrencyError::MissingRate(target.to_string()))?;
                info!("successfully fetched exchange rate {} -> {}", base, target);
                Ok(rate)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(CurrencyError::RateLimited),
            status => Err(CurrencyError::UnexpectedStatus(status.as_u16())),
        }
    }
}

/// Convert `amount` from `base` to `target` using the given rate source.
/// Equal currency codes short-circuit to the amount itself, no lookup made.
pub fn convert_amount(
    rates: &dyn RateSource,
    amount: Decimal,
    base: &str,
    target: &str,
) -> Result<Decimal, CurrencyError> {
    if base == target {
        return Ok(amount);
    }
    let rate = rates.fetch_rate(base, target)?;
    Ok(amount * rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::str::FromStr;

    #[test]
    fn test_same_currency_skips_lookup() {
        // Any call on the mock would panic: no expectations are set
        let rates = MockRateSource::new();
        let amount = Decimal::from(5000);
        assert_eq!(
            convert_amount(&rates, amount, "USD", "USD").unwrap(),
            amount
        );
    }

    #[test]
    fn test_conversion_multiplies_by_rate() {
        let mut rates = MockRateSource::new();
        rates
            .expect_fetch_rate()
            .with(eq("USD"), eq("EUR"))
            .times(1)
            .returning(|_, _| Ok(Decimal::from_str("0.5").unwrap()));

        let converted = convert_amount(&rates, Decimal::from(5000), "USD", "EUR").unwrap();
        assert_eq!(converted, Decimal::from(2500));
    }

    #[test]
    fn test_rate_limit_blocks_conversion() {
        let mut rates = MockRateSource::new();
        rates
            .expect_fetch_rate()
            .times(1)
            .returning(|_, _| Err(CurrencyError::RateLimited));

        let result = convert_amount(&rates, Decimal::from(100), "USD", "EUR");
        assert!(matches!(result, Err(CurrencyError::RateLimited)));
    }
}
