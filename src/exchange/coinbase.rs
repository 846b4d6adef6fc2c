//! Coinbase Exchange public ticker adapter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::traits::QuoteSource;
use super::types::AdapterError;

const BASE_URL: &str = "https://api.exchange.coinbase.com";
const EXCHANGE: &str = "Coinbase";

/// Product ticker from `/products/{id}/ticker`.
#[derive(Debug, Clone, Deserialize)]
struct ProductTicker {
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

/// Quote source backed by the Coinbase Exchange product ticker endpoint.
///
/// Coinbase has no bulk last-price endpoint, so pairs are queried one
/// product at a time; an unknown product (404) means the pair is absent,
/// not that the fetch failed.
#[derive(Debug, Clone)]
pub struct CoinbaseSource {
    http: Client,
    base_url: String,
}

impl CoinbaseSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Create a source against a custom base URL (used by tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        // Coinbase rejects requests without a User-Agent.
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("arb-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// "BTC/USDT" -> "BTC-USDT".
    fn native_symbol(pair: &str) -> String {
        pair.replace('/', "-")
    }
}

#[async_trait]
impl QuoteSource for CoinbaseSource {
    fn name(&self) -> &str {
        EXCHANGE
    }

    #[instrument(skip(self, pairs), name = "coinbase_fetch")]
    async fn fetch_quotes(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, Decimal>, AdapterError> {
        let mut quotes = HashMap::new();

        for pair in pairs {
            let url = format!(
                "{}/products/{}/ticker",
                self.base_url,
                Self::native_symbol(pair)
            );
            let response = self.http.get(&url).send().await.map_err(|source| {
                AdapterError::Http {
                    exchange: EXCHANGE.to_string(),
                    source,
                }
            })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AdapterError::Api {
                    exchange: EXCHANGE.to_string(),
                    detail: format!("{status}: {body}"),
                });
            }

            let ticker: ProductTicker = response.json().await.map_err(|e| {
                AdapterError::Parse {
                    exchange: EXCHANGE.to_string(),
                    detail: e.to_string(),
                }
            })?;
            quotes.insert(pair.clone(), ticker.price);
        }

        debug!(
            requested = pairs.len(),
            returned = quotes.len(),
            "Fetched Coinbase tickers"
        );
        Ok(quotes)
    }
}
