//! Kraken public ticker adapter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

use super::traits::QuoteSource;
use super::types::AdapterError;

const BASE_URL: &str = "https://api.kraken.com";
const EXCHANGE: &str = "Kraken";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    /// Last trade closed: [price, lot volume].
    c: Vec<String>,
}

/// Quote source backed by the Kraken public ticker endpoint.
///
/// Kraken renames pairs in its responses (e.g. `XBTUSDT` comes back as
/// `XBTUSDT` or `XXBTZUSD` depending on listing), so each pair is queried
/// alone and the single result entry is read regardless of its key.
#[derive(Debug, Clone)]
pub struct KrakenSource {
    http: Client,
    base_url: String,
}

impl KrakenSource {
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

    /// "BTC/USDT" -> "XBTUSDT". Kraken lists bitcoin as XBT.
    fn native_symbol(pair: &str) -> String {
        pair.replace("BTC", "XBT").replace('/', "")
    }

    fn is_unknown_pair(errors: &[String]) -> bool {
        errors.iter().any(|e| e.contains("Unknown asset pair"))
    }
}

#[async_trait]
impl QuoteSource for KrakenSource {
    fn name(&self) -> &str {
        EXCHANGE
    }

    #[instrument(skip(self, pairs), name = "kraken_fetch")]
    async fn fetch_quotes(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, Decimal>, AdapterError> {
        let mut quotes = HashMap::new();

        for pair in pairs {
            let url = format!(
                "{}/0/public/Ticker?pair={}",
                self.base_url,
                Self::native_symbol(pair)
            );
            let response = self.http.get(&url).send().await.map_err(|source| {
                AdapterError::Http {
                    exchange: EXCHANGE.to_string(),
                    source,
                }
            })?;

            let body: TickerResponse = response.json().await.map_err(|e| {
                AdapterError::Parse {
                    exchange: EXCHANGE.to_string(),
                    detail: e.to_string(),
                }
            })?;

            if !body.error.is_empty() {
                if Self::is_unknown_pair(&body.error) {
                    continue;
                }
                return Err(AdapterError::Api {
                    exchange: EXCHANGE.to_string(),
                    detail: body.error.join("; "),
                });
            }

            let Some(entry) = body.result.values().next() else {
                continue;
            };
            let Some(last) = entry.c.first() else {
                continue;
            };
            let price = Decimal::from_str(last).map_err(|e| AdapterError::Parse {
                exchange: EXCHANGE.to_string(),
                detail: format!("bad price {last:?}: {e}"),
            })?;
            quotes.insert(pair.clone(), price);
        }

        debug!(
            requested = pairs.len(),
            returned = quotes.len(),
            "Fetched Kraken tickers"
        );
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_native_symbol_uses_xbt() {
        assert_eq!(KrakenSource::native_symbol("BTC/USDT"), "XBTUSDT");
        assert_eq!(KrakenSource::native_symbol("ETH/USDT"), "ETHUSDT");
    }

    #[tokio::test]
    async fn test_fetch_reads_renamed_result_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/0/public/Ticker"))
            .and(query_param("pair", "XBTUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": [],
                "result": {
                    "XXBTZUSD": {
                        "a": ["64310.1", "1", "1.0"],
                        "b": ["64309.9", "1", "1.0"],
                        "c": ["64310.00", "0.005"],
                    }
                }
            })))
            .mount(&server)
            .await;

        let source = KrakenSource::with_base_url(&server.uri()).unwrap();
        let quotes = source
            .fetch_quotes(&["BTC/USDT".to_string()])
            .await
            .unwrap();

        assert_eq!(quotes["BTC/USDT"], dec!(64310.00));
    }

    #[tokio::test]
    async fn test_unknown_pair_is_absent_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/0/public/Ticker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": ["EQuery:Unknown asset pair"],
            })))
            .mount(&server)
            .await;

        let source = KrakenSource::with_base_url(&server.uri()).unwrap();
        let quotes = source
            .fetch_quotes(&["XMR/USDT".to_string()])
            .await
            .unwrap();

        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/0/public/Ticker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": ["EService:Unavailable"],
            })))
            .mount(&server)
            .await;

        let source = KrakenSource::with_base_url(&server.uri()).unwrap();
        let err = source
            .fetch_quotes(&["BTC/USDT".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Api { .. }));
    }
}
