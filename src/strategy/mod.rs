//! Spread detection over aggregated cross-exchange quotes.

pub mod aggregator;
pub mod detector;

pub use aggregator::{aggregate, AggregatedPrices, ExchangePrices};
pub use detector::{Opportunity, OpportunityDetector};
