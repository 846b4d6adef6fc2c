//! Configurable in-memory quote source for tests and single-feed runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::QuoteSource;
use super::types::AdapterError;

/// A quote source with settable prices, injectable failure, and an optional
/// artificial delay for exercising the per-adapter timeout path.
pub struct MockQuoteSource {
    name: String,
    prices: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl MockQuoteSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prices: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
            delay: Mutex::new(None),
        }
    }

    /// Builder-style price entry.
    pub fn with_price(self, pair: &str, price: Decimal) -> Self {
        self.set_price(pair, price);
        self
    }

    pub fn set_price(&self, pair: &str, price: Decimal) {
        self.prices.lock().insert(pair.to_string(), price);
    }

    pub fn remove_price(&self, pair: &str) {
        self.prices.lock().remove(pair);
    }

    /// When failing, every fetch returns an API error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Delay every fetch, for timeout tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quotes(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, Decimal>, AdapterError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.failing.lock() {
            return Err(AdapterError::Api {
                exchange: self.name.clone(),
                detail: "injected failure".to_string(),
            });
        }

        let prices = self.prices.lock();
        Ok(pairs
            .iter()
            .filter_map(|pair| prices.get(pair).map(|p| (pair.clone(), *p)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_returns_only_requested_pairs() {
        let source = MockQuoteSource::new("MockEx")
            .with_price("BTC/USDT", dec!(64000))
            .with_price("ETH/USDT", dec!(3100));

        let quotes = source
            .fetch_quotes(&["BTC/USDT".to_string(), "SOL/USDT".to_string()])
            .await
            .unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["BTC/USDT"], dec!(64000));
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let source = MockQuoteSource::new("MockEx").with_price("BTC/USDT", dec!(64000));
        source.set_failing(true);

        let err = source
            .fetch_quotes(&["BTC/USDT".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.exchange(), "MockEx");

        source.set_failing(false);
        assert!(source.fetch_quotes(&["BTC/USDT".to_string()]).await.is_ok());
    }
}
