//! Fiat/crypto price multipliers.
//!
//! Sample response for `fsym=BLOCK&tsyms=BTC,EUR,GBP,USD`:
//! `{"USD":1.044,"BTC":0.00009999,"EUR":0.8827,"GBP":0.7893}`

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::PriceError;

/// Default price API.
pub const CRYPTOCOMPARE_URL: &str = "https://min-api.cryptocompare.com/data/price";

/// Price source consumed by the controller's multiplier sweep.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Currency code -> price of one `ticker` in that currency.
    async fn fetch_prices(
        &self,
        ticker: &str,
        currencies: &[String],
    ) -> Result<BTreeMap<String, f64>, PriceError>;
}

/// [`PriceFetcher`] over the CryptoCompare `data/price` endpoint.
#[derive(Debug, Clone)]
pub struct CryptoCompareFetcher {
    client: Client,
    base_url: String,
}

impl CryptoCompareFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PriceFetcher for CryptoCompareFetcher {
    async fn fetch_prices(
        &self,
        ticker: &str,
        currencies: &[String],
    ) -> Result<BTreeMap<String, f64>, PriceError> {
        let tsyms = currencies.join(",");
        debug!(%ticker, %tsyms, "requesting prices");
        let body: Value = self
            .client
            .get(&self.base_url)
            .query(&[("fsym", ticker), ("tsyms", tsyms.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_prices(body)
    }
}

/// Decode a `data/price` body. Error bodies carry `"Response": "Error"`.
pub fn parse_prices(body: Value) -> Result<BTreeMap<String, f64>, PriceError> {
    let Value::Object(map) = body else {
        return Err(PriceError::Decode("expected an object".into()));
    };
    if map.get("Response").and_then(Value::as_str) == Some("Error") {
        let message = map
            .get("Message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(PriceError::Api(message.to_string()));
    }

    let mut prices = BTreeMap::new();
    for (currency, value) in map {
        let price = value
            .as_f64()
            .ok_or_else(|| PriceError::Decode(format!("{currency}: not a number")))?;
        prices.insert(currency, price);
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_price_object() {
        let prices = parse_prices(json!({"USD": 1.044, "BTC": 0.00009999})).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["USD"], 1.044);
    }

    #[test]
    fn parse_api_error() {
        let err = parse_prices(json!({
            "Response": "Error",
            "Message": "There is no data for the symbol XYZ .",
        }))
        .unwrap_err();
        assert!(matches!(err, PriceError::Api(m) if m.contains("XYZ")));
    }

    #[test]
    fn parse_rejects_non_numbers() {
        assert!(matches!(
            parse_prices(json!({"USD": "1.0"})),
            Err(PriceError::Decode(_))
        ));
        assert!(matches!(parse_prices(json!([1, 2])), Err(PriceError::Decode(_))));
    }

    #[test]
    fn fetcher_keeps_base_url() {
        let f = CryptoCompareFetcher::new(CRYPTOCOMPARE_URL, Duration::from_secs(5)).unwrap();
        assert_eq!(f.base_url(), CRYPTOCOMPARE_URL);
    }
}
