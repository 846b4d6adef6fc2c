//! Cross-exchange spread detection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::aggregator::{AggregatedPrices, ExchangePrices};

/// A cross-exchange price discrepancy worth acting on.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub pair: String,
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    #[serde(rename = "spread_percentage")]
    pub spread_pct: Decimal,
    pub potential_profit: Decimal,
    pub confidence_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Scans aggregated quotes for spreads above a configured threshold.
#[derive(Debug, Clone)]
pub struct OpportunityDetector {
    min_spread_pct: Decimal,
    notional_trade_size: Decimal,
}

impl OpportunityDetector {
    pub fn new(min_spread_pct: Decimal, notional_trade_size: Decimal) -> Self {
        Self {
            min_spread_pct,
            notional_trade_size,
        }
    }

    /// Find at most one opportunity per pair: the best buy venue against
    /// the best sell venue. Results are sorted by spread, widest first,
    /// with pair name breaking ties so output order is stable.
    pub fn detect(&self, aggregated: &AggregatedPrices, now: DateTime<Utc>) -> Vec<Opportunity> {
        let mut opportunities: Vec<Opportunity> = aggregated
            .iter()
            .filter_map(|(pair, listings)| self.evaluate_pair(pair, listings, now))
            .collect();

        opportunities.sort_by(|a, b| {
            b.spread_pct
                .cmp(&a.spread_pct)
                .then_with(|| a.pair.cmp(&b.pair))
        });

        debug!(count = opportunities.len(), "Detected opportunities");
        opportunities
    }

    fn evaluate_pair(
        &self,
        pair: &str,
        listings: &ExchangePrices,
        now: DateTime<Utc>,
    ) -> Option<Opportunity> {
        let mut buy = listings.first()?;
        let mut sell = buy;

        // Strict comparisons keep the first-seen venue on equal prices.
        for listing in &listings[1..] {
            if listing.1 < buy.1 {
                buy = listing;
            }
            if listing.1 > sell.1 {
                sell = listing;
            }
        }

        if buy.1 <= Decimal::ZERO {
            return None;
        }

        let spread_pct = (sell.1 - buy.1) / buy.1 * Decimal::ONE_HUNDRED;
        if spread_pct <= self.min_spread_pct {
            return None;
        }

        Some(Opportunity {
            pair: pair.to_string(),
            buy_exchange: buy.0.clone(),
            sell_exchange: sell.0.clone(),
            buy_price: buy.1,
            sell_price: sell.1,
            spread_pct,
            potential_profit: spread_pct / Decimal::ONE_HUNDRED * self.notional_trade_size,
            confidence_score: 0.0,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn aggregated_one(pair: &str, listings: &[(&str, Decimal)]) -> AggregatedPrices {
        let mut map = HashMap::new();
        map.insert(
            pair.to_string(),
            listings
                .iter()
                .map(|(ex, p)| (ex.to_string(), *p))
                .collect(),
        );
        map
    }

    #[test]
    fn test_detects_widest_spread_per_pair() {
        let detector = OpportunityDetector::new(dec!(0.1), dec!(1000));
        let aggregated = aggregated_one(
            "BTC/USDT",
            &[("A", dec!(100)), ("B", dec!(101)), ("C", dec!(99))],
        );

        let opportunities = detector.detect(&aggregated, Utc::now());

        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        assert_eq!(opp.buy_exchange, "C");
        assert_eq!(opp.sell_exchange, "B");
        assert_eq!(opp.buy_price, dec!(99));
        assert_eq!(opp.sell_price, dec!(101));
        assert_eq!(opp.spread_pct.round_dp(4), dec!(2.0202));
        assert_eq!(opp.potential_profit.round_dp(4), dec!(20.2020));
    }

    #[test]
    fn test_threshold_is_strict() {
        let detector = OpportunityDetector::new(dec!(0.1), dec!(1000));

        // 0.05% spread: below threshold.
        let below = aggregated_one("BTC/USDT", &[("A", dec!(100000)), ("B", dec!(100050))]);
        assert!(detector.detect(&below, Utc::now()).is_empty());

        // 0.15% spread: above threshold.
        let above = aggregated_one("BTC/USDT", &[("A", dec!(100000)), ("B", dec!(100150))]);
        assert_eq!(detector.detect(&above, Utc::now()).len(), 1);

        // Exactly at threshold is excluded.
        let at = aggregated_one("BTC/USDT", &[("A", dec!(100000)), ("B", dec!(100100))]);
        assert!(detector.detect(&at, Utc::now()).is_empty());
    }

    #[test]
    fn test_equal_prices_keep_first_seen_venue() {
        let detector = OpportunityDetector::new(dec!(0.1), dec!(1000));
        let aggregated = aggregated_one(
            "BTC/USDT",
            &[("A", dec!(100)), ("B", dec!(100)), ("C", dec!(105))],
        );

        let opportunities = detector.detect(&aggregated, Utc::now());

        assert_eq!(opportunities[0].buy_exchange, "A");
        assert_eq!(opportunities[0].sell_exchange, "C");
    }

    #[test]
    fn test_zero_price_listing_is_skipped() {
        let detector = OpportunityDetector::new(dec!(0.1), dec!(1000));
        let aggregated = aggregated_one("BTC/USDT", &[("A", dec!(0)), ("B", dec!(105))]);

        assert!(detector.detect(&aggregated, Utc::now()).is_empty());
    }

    #[test]
    fn test_output_sorted_by_spread_then_pair() {
        let detector = OpportunityDetector::new(dec!(0.1), dec!(1000));
        let mut aggregated = aggregated_one("ETH/USDT", &[("A", dec!(100)), ("B", dec!(102))]);
        aggregated.insert(
            "BTC/USDT".to_string(),
            vec![("A".to_string(), dec!(100)), ("B".to_string(), dec!(105))],
        );
        aggregated.insert(
            "BNB/USDT".to_string(),
            vec![("A".to_string(), dec!(100)), ("B".to_string(), dec!(102))],
        );

        let opportunities = detector.detect(&aggregated, Utc::now());
        let pairs: Vec<&str> = opportunities.iter().map(|o| o.pair.as_str()).collect();

        // Widest first; equal spreads ordered by pair name.
        assert_eq!(pairs, vec!["BTC/USDT", "BNB/USDT", "ETH/USDT"]);
    }
}
