//! Broadcast surface: subscriber registry plus the HTTP/websocket API.

pub mod registry;
pub mod ws;

pub use registry::SubscriberRegistry;
pub use ws::{router, ApiState, UpdateFrame};
