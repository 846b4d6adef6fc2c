//! Binance public ticker adapter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::traits::QuoteSource;
use super::types::AdapterError;

const BASE_URL: &str = "https://api.binance.com";
const EXCHANGE: &str = "Binance";

/// Last-price entry from `/api/v3/ticker/price`.
#[derive(Debug, Clone, Deserialize)]
struct PriceTicker {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

/// Quote source backed by the Binance spot ticker endpoint.
///
/// Fetches the full ticker table in one request and filters to the
/// requested pairs; unlisted pairs are simply absent from the result.
#[derive(Debug, Clone)]
pub struct BinanceSource {
    http: Client,
    base_url: String,
}

impl BinanceSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Create a source against a custom base URL (used by tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// "BTC/USDT" -> "BTCUSDT".
    fn native_symbol(pair: &str) -> String {
        pair.replace('/', "")
    }
}

#[async_trait]
impl QuoteSource for BinanceSource {
    fn name(&self) -> &str {
        EXCHANGE
    }

    #[instrument(skip(self, pairs), name = "binance_fetch")]
    async fn fetch_quotes(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, Decimal>, AdapterError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let response = self.http.get(&url).send().await.map_err(|source| {
            AdapterError::Http {
                exchange: EXCHANGE.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                exchange: EXCHANGE.to_string(),
                detail: format!("{status}: {body}"),
            });
        }

        let tickers: Vec<PriceTicker> = response.json().await.map_err(|e| {
            AdapterError::Parse {
                exchange: EXCHANGE.to_string(),
                detail: e.to_string(),
            }
        })?;

        let by_symbol: HashMap<String, Decimal> = tickers
            .into_iter()
            .map(|t| (t.symbol, t.price))
            .collect();

        let mut quotes = HashMap::new();
        for pair in pairs {
            if let Some(price) = by_symbol.get(&Self::native_symbol(pair)) {
                quotes.insert(pair.clone(), *price);
            }
        }

        debug!(
            requested = pairs.len(),
            returned = quotes.len(),
            "Fetched Binance tickers"
        );
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_native_symbol() {
        assert_eq!(BinanceSource::native_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(BinanceSource::native_symbol("ETH/USDT"), "ETHUSDT");
    }

    #[tokio::test]
    async fn test_fetch_filters_requested_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "BTCUSDT", "price": "64321.50"},
                {"symbol": "ETHUSDT", "price": "3120.01"},
                {"symbol": "DOGEUSDT", "price": "0.15"},
            ])))
            .mount(&server)
            .await;

        let source = BinanceSource::with_base_url(&server.uri()).unwrap();
        let pairs = vec!["BTC/USDT".to_string(), "XMR/USDT".to_string()];
        let quotes = source.fetch_quotes(&pairs).await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["BTC/USDT"], dec!(64321.50));
        // Unlisted pair is absent, not an error.
        assert!(!quotes.contains_key("XMR/USDT"));
    }

    #[tokio::test]
    async fn test_server_error_is_api_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let source = BinanceSource::with_base_url(&server.uri()).unwrap();
        let err = source
            .fetch_quotes(&["BTC/USDT".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Api { .. }));
        assert_eq!(err.exchange(), "Binance");
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let source = BinanceSource::with_base_url(&server.uri()).unwrap();
        let err = source
            .fetch_quotes(&["BTC/USDT".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Parse { .. }));
    }
}
