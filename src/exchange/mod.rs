//! Exchange quote source adapters.
//!
//! Each adapter wraps one exchange's public last-price endpoint behind the
//! [`QuoteSource`] capability and fails independently: a broken or slow
//! exchange costs only its own quotes for the cycle.
//!
//! `MockQuoteSource` backs the test suite and degenerate single-feed
//! deployments.

mod binance;
mod coinbase;
mod kraken;
pub mod mock;
mod traits;
mod types;

pub use binance::BinanceSource;
pub use coinbase::CoinbaseSource;
pub use kraken::KrakenSource;
pub use mock::MockQuoteSource;
pub use traits::QuoteSource;
pub use types::{AdapterError, QuoteSet};
