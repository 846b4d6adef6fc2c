//! Fetch-detect-score-broadcast cycle driver.

use arc_swap::ArcSwap;
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::exchange::{AdapterError, QuoteSet, QuoteSource};
use crate::model::{FeatureVector, Scorer};
use crate::server::{SubscriberRegistry, UpdateFrame};
use crate::strategy::{aggregate, Opportunity, OpportunityDetector};

/// Runs the market-data loop: concurrent quote fetches, spread
/// detection, confidence scoring, and a broadcast to every subscriber,
/// once per configured interval.
pub struct ArbitrageEngine {
    sources: Vec<Arc<dyn QuoteSource>>,
    pairs: Vec<String>,
    detector: OpportunityDetector,
    scorer: Arc<Scorer>,
    registry: Arc<SubscriberRegistry>,
    latest: Arc<ArcSwap<Vec<Opportunity>>>,
    fetch_timeout: Duration,
    interval: Duration,
}

impl ArbitrageEngine {
    pub fn new(
        sources: Vec<Arc<dyn QuoteSource>>,
        config: &Config,
        scorer: Arc<Scorer>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            sources,
            pairs: config.pairs.clone(),
            detector: OpportunityDetector::new(
                config.detection.min_spread_pct,
                config.detection.notional_trade_size,
            ),
            scorer,
            registry,
            latest: Arc::new(ArcSwap::from_pointee(Vec::new())),
            fetch_timeout: config.fetch.timeout(),
            interval: config.broadcast.interval(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Handle to the latest cycle's opportunities, shared with the API.
    pub fn latest(&self) -> Arc<ArcSwap<Vec<Opportunity>>> {
        Arc::clone(&self.latest)
    }

    /// Fetch quotes from every source concurrently. A source that errors
    /// or misses the deadline contributes nothing this cycle; the rest
    /// are unaffected.
    async fn fetch_all(&self) -> Vec<QuoteSet> {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let pairs = self.pairs.clone();
            let deadline = self.fetch_timeout;
            async move {
                let result = tokio::time::timeout(deadline, source.fetch_quotes(&pairs))
                    .await
                    .unwrap_or_else(|_| {
                        Err(AdapterError::Timeout {
                            exchange: source.name().to_string(),
                            timeout: deadline,
                        })
                    });
                (source.name().to_string(), result)
            }
        });

        let mut quote_sets = Vec::with_capacity(self.sources.len());
        for (exchange, result) in join_all(fetches).await {
            match result {
                Ok(prices) => {
                    debug!(exchange = %exchange, quotes = prices.len(), "Quotes fetched");
                    quote_sets.push(QuoteSet {
                        exchange,
                        prices,
                        observed_at: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(exchange = %exchange, error = %e, "Quote fetch failed");
                }
            }
        }
        quote_sets
    }

    /// One full pass: fetch, aggregate, detect, score, publish snapshot.
    pub async fn run_cycle(&self) -> Vec<Opportunity> {
        let quote_sets = self.fetch_all().await;
        let aggregated = aggregate(&self.pairs, &quote_sets);
        let mut opportunities = self.detector.detect(&aggregated, Utc::now());

        for opportunity in &mut opportunities {
            let Some(listings) = aggregated.get(&opportunity.pair) else {
                continue;
            };
            let features = FeatureVector::from_cycle(opportunity.spread_pct, listings);
            opportunity.confidence_score = self.scorer.score(&features);
        }

        self.latest.store(Arc::new(opportunities.clone()));
        opportunities
    }

    /// Broadcast loop. Cycles run back to back with an inter-cycle sleep;
    /// `shutdown` flipping to true ends the loop at the next opportunity.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            sources = self.sources.len(),
            pairs = self.pairs.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Engine started"
        );

        while !*shutdown.borrow() {
            // The cycle itself races shutdown, so a stop request does not
            // wait out a slow adapter fetch.
            let opportunities = tokio::select! {
                opportunities = self.run_cycle() => opportunities,
                _ = shutdown.changed() => break,
            };

            match serde_json::to_string(&UpdateFrame::new(&opportunities)) {
                Ok(frame) => {
                    let delivered = self.registry.broadcast_all(&frame);
                    info!(
                        opportunities = opportunities.len(),
                        subscribers = delivered,
                        trained = self.scorer.is_trained(),
                        "Cycle broadcast"
                    );
                }
                Err(e) => warn!(error = %e, "Failed to encode update frame"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Engine stopped");
    }
}
