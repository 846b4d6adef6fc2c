//! HTTP and websocket surface.
//!
//! `/ws/market-data` streams ranked opportunity frames; `/api/opportunities`
//! serves the latest cycle's snapshot for clients that poll instead.

use arc_swap::ArcSwap;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::strategy::Opportunity;

use super::registry::SubscriberRegistry;

/// Frame pushed to websocket subscribers each cycle.
#[derive(Debug, Serialize)]
pub struct UpdateFrame<'a> {
    pub r#type: &'static str,
    pub data: &'a [Opportunity],
}

impl<'a> UpdateFrame<'a> {
    pub fn new(data: &'a [Opportunity]) -> Self {
        Self {
            r#type: "update",
            data,
        }
    }
}

/// Shared state behind the HTTP surface.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<SubscriberRegistry>,
    pub latest: Arc<ArcSwap<Vec<Opportunity>>>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/ws/market-data", get(websocket_handler))
        .route("/api/opportunities", get(latest_opportunities))
        .route("/health", get(health))
        .with_state(state)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: ApiState) {
    let (id, mut queue) = state.registry.add();

    // New subscribers get the latest snapshot immediately rather than
    // waiting out the rest of the broadcast interval.
    let snapshot = state.latest.load();
    if let Ok(frame) = serde_json::to_string(&UpdateFrame::new(&snapshot)) {
        if socket.send(Message::Text(frame)).await.is_err() {
            state.registry.remove(id);
            return;
        }
    }

    loop {
        tokio::select! {
            queued = queue.recv() => {
                let Some(payload) = queued else { break };
                if let Err(e) = socket.send(Message::Text(payload)).await {
                    debug!(subscriber = %id, error = %e, "Websocket send failed");
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(subscriber = %id, error = %e, "Websocket receive error");
                        break;
                    }
                    // Pings are answered by axum; other inbound is ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.registry.remove(id);
    debug!(subscriber = %id, "Websocket closed");
}

async fn latest_opportunities(State(state): State<ApiState>) -> Json<Vec<Opportunity>> {
    Json(state.latest.load().as_ref().clone())
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_frame_shape() {
        let frame = UpdateFrame::new(&[]);
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"type":"update","data":[]}"#
        );
    }

    #[test]
    fn test_frame_serializes_opportunity_fields() {
        let opportunity = Opportunity {
            pair: "BTC/USDT".to_string(),
            buy_exchange: "Kraken".to_string(),
            sell_exchange: "Binance".to_string(),
            buy_price: dec!(99),
            sell_price: dec!(101),
            spread_pct: dec!(2.02),
            potential_profit: dec!(20.20),
            confidence_score: 69.0,
            timestamp: Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap(),
        };
        let data = vec![opportunity];

        let json = serde_json::to_string(&UpdateFrame::new(&data)).unwrap();

        assert!(json.starts_with(r#"{"type":"update","data":["#));
        assert!(json.contains(r#""spread_percentage":"2.02""#));
        assert!(json.contains(r#""buy_exchange":"Kraken""#));
        assert!(json.contains(r#""confidence_score":69.0"#));
    }
}
