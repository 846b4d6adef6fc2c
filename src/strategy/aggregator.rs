//! Cross-exchange quote aggregation.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::exchange::QuoteSet;

/// Per-pair price listing, one entry per exchange that quoted it.
/// Entries keep the arrival order of the quote sets they came from.
pub type ExchangePrices = Vec<(String, Decimal)>;

/// Pairs mapped to the exchanges quoting them this cycle.
pub type AggregatedPrices = HashMap<String, ExchangePrices>;

/// Regroup per-exchange quote sets into per-pair exchange listings.
///
/// Pairs quoted by fewer than two exchanges are dropped: a spread needs
/// at least two venues to exist.
pub fn aggregate(pairs: &[String], quote_sets: &[QuoteSet]) -> AggregatedPrices {
    let mut aggregated: AggregatedPrices = HashMap::new();

    for quote_set in quote_sets {
        for pair in pairs {
            if let Some(price) = quote_set.prices.get(pair) {
                aggregated
                    .entry(pair.clone())
                    .or_default()
                    .push((quote_set.exchange.clone(), *price));
            }
        }
    }

    aggregated.retain(|_, listings| listings.len() >= 2);

    debug!(
        pairs = aggregated.len(),
        sources = quote_sets.len(),
        "Aggregated quotes"
    );
    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote_set(exchange: &str, entries: &[(&str, Decimal)]) -> QuoteSet {
        QuoteSet {
            exchange: exchange.to_string(),
            prices: entries
                .iter()
                .map(|(pair, price)| (pair.to_string(), *price))
                .collect(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_exchange_pair_is_dropped() {
        let pairs = vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()];
        let sets = vec![
            quote_set("A", &[("BTC/USDT", dec!(100)), ("ETH/USDT", dec!(10))]),
            quote_set("B", &[("BTC/USDT", dec!(101))]),
        ];

        let aggregated = aggregate(&pairs, &sets);

        assert_eq!(aggregated.len(), 1);
        assert!(aggregated.contains_key("BTC/USDT"));
        assert!(!aggregated.contains_key("ETH/USDT"));
    }

    #[test]
    fn test_listings_keep_source_order() {
        let pairs = vec!["BTC/USDT".to_string()];
        let sets = vec![
            quote_set("A", &[("BTC/USDT", dec!(100))]),
            quote_set("B", &[("BTC/USDT", dec!(101))]),
            quote_set("C", &[("BTC/USDT", dec!(99))]),
        ];

        let aggregated = aggregate(&pairs, &sets);
        let listings = &aggregated["BTC/USDT"];

        assert_eq!(listings[0], ("A".to_string(), dec!(100)));
        assert_eq!(listings[1], ("B".to_string(), dec!(101)));
        assert_eq!(listings[2], ("C".to_string(), dec!(99)));
    }

    #[test]
    fn test_unrequested_pairs_are_ignored() {
        let pairs = vec!["BTC/USDT".to_string()];
        let sets = vec![
            quote_set("A", &[("BTC/USDT", dec!(100)), ("DOGE/USDT", dec!(1))]),
            quote_set("B", &[("BTC/USDT", dec!(101)), ("DOGE/USDT", dec!(1))]),
        ];

        let aggregated = aggregate(&pairs, &sets);

        assert_eq!(aggregated.len(), 1);
        assert!(!aggregated.contains_key("DOGE/USDT"));
    }
}
