//! Exchange-agnostic quote source capability.
//!
//! Provides a common interface for pulling last-traded prices from any
//! exchange for:
//! - Cross-exchange spread detection
//! - Independent per-exchange failure handling
//! - Swapping real adapters for mocks in tests

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::types::AdapterError;

/// A source of last-traded prices for one exchange.
///
/// Implementations must tolerate partial coverage: a requested pair the
/// exchange does not list is simply absent from the returned map, not an
/// error. The engine bounds every call with the configured per-adapter
/// timeout, so a slow implementation is cut off rather than stalling the
/// cycle.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Display name used as the exchange identifier in quotes and logs.
    fn name(&self) -> &str;

    /// Fetch last prices for the requested pairs, keyed by pair.
    async fn fetch_quotes(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, Decimal>, AdapterError>;
}
