//! Quote types and the adapter failure taxonomy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// One adapter's quotes for a single cycle: last-traded prices keyed by
/// pair, stamped with the exchange that produced them.
///
/// Quote sets are built fresh per fetch and discarded after one aggregation
/// cycle; the core keeps no price history.
#[derive(Debug, Clone)]
pub struct QuoteSet {
    pub exchange: String,
    pub prices: HashMap<String, Decimal>,
    pub observed_at: DateTime<Utc>,
}

/// Failure modes for a single adapter fetch.
///
/// Every variant carries the exchange identity so a failure can be logged
/// and attributed. A failed adapter costs only its own quotes for the cycle;
/// it never aborts the cycle.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{exchange}: request failed: {source}")]
    Http {
        exchange: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{exchange}: API error: {detail}")]
    Api { exchange: String, detail: String },

    #[error("{exchange}: malformed response: {detail}")]
    Parse { exchange: String, detail: String },

    #[error("{exchange}: no response within {timeout:?}")]
    Timeout { exchange: String, timeout: Duration },
}

impl AdapterError {
    /// Exchange the failure originated from.
    pub fn exchange(&self) -> &str {
        match self {
            AdapterError::Http { exchange, .. }
            | AdapterError::Api { exchange, .. }
            | AdapterError::Parse { exchange, .. }
            | AdapterError::Timeout { exchange, .. } => exchange,
        }
    }
}
