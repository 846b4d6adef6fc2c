//! # Arb Tracker
//!
//! Cross-exchange arbitrage monitor. Fetches spot quotes from several
//! exchanges concurrently, detects price spreads above a configured
//! threshold, attaches a confidence score from a trained classifier
//! (with a deterministic fallback before training), and broadcasts the
//! ranked opportunities to websocket subscribers on a fixed cadence.
//!
//! Modules:
//! - [`exchange`]: per-exchange quote source adapters
//! - [`strategy`]: quote aggregation and spread detection
//! - [`model`]: feature extraction, training, and confidence scoring
//! - [`server`]: subscriber registry and the HTTP/websocket surface
//! - [`engine`]: the fetch-detect-score-broadcast loop
//! - [`config`]: layered configuration

pub mod config;
pub mod engine;
pub mod exchange;
pub mod model;
pub mod server;
pub mod strategy;

pub use config::Config;
pub use engine::ArbitrageEngine;
