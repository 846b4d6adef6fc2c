//! Feature extraction for confidence scoring.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::strategy::ExchangePrices;

/// Width of the model input, shared by scaler and forest.
pub const N_FEATURES: usize = 3;

/// The three inputs the classifier was trained on, in model order:
/// spread, volatility, liquidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub spread_pct: f64,
    pub volatility: f64,
    pub liquidity: f64,
}

impl FeatureVector {
    pub fn new(spread_pct: f64, volatility: f64, liquidity: f64) -> Self {
        Self {
            spread_pct,
            volatility,
            liquidity,
        }
    }

    /// Build live features from one cycle's per-exchange prices.
    ///
    /// Volatility is the population standard deviation of each venue's
    /// relative deviation from the cross-exchange mean; liquidity is a
    /// log proxy on the mean price, matching the scale the trainer uses
    /// for volume.
    pub fn from_cycle(spread_pct: Decimal, listings: &ExchangePrices) -> Self {
        let spread = spread_pct.to_f64().unwrap_or(0.0);
        let prices: Vec<f64> = listings
            .iter()
            .filter_map(|(_, p)| p.to_f64())
            .collect();

        if prices.is_empty() {
            return Self::new(spread, 0.0, 0.0);
        }

        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        let volatility = if mean > 0.0 {
            let variance = prices
                .iter()
                .map(|p| {
                    let dev = p / mean - 1.0;
                    dev * dev
                })
                .sum::<f64>()
                / prices.len() as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Self::new(spread, volatility, (mean + 1.0).ln())
    }

    pub fn as_array(&self) -> [f64; N_FEATURES] {
        [self.spread_pct, self.volatility, self.liquidity]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_equal_prices_have_zero_volatility() {
        let listings = vec![
            ("A".to_string(), dec!(100)),
            ("B".to_string(), dec!(100)),
            ("C".to_string(), dec!(100)),
        ];

        let features = FeatureVector::from_cycle(dec!(0.5), &listings);

        assert_eq!(features.spread_pct, 0.5);
        assert_eq!(features.volatility, 0.0);
        assert!((features.liquidity - 101.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_known_dispersion() {
        let listings = vec![("A".to_string(), dec!(100)), ("B".to_string(), dec!(102))];

        let features = FeatureVector::from_cycle(dec!(2), &listings);

        // Mean 101; deviations +/- 1/101.
        assert!((features.volatility - 1.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_listings_degrade_gracefully() {
        let features = FeatureVector::from_cycle(dec!(1), &Vec::new());

        assert_eq!(features.volatility, 0.0);
        assert_eq!(features.liquidity, 0.0);
    }
}
