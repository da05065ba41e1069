//! Swarm Socket - reconnecting WebSocket client for the dev server channel.
//!
//! This crate provides:
//! - A typed event emitter with persistent and one-shot listeners
//! - The inbound/outbound wire payloads and their typed views
//! - Socket URL derivation from options and the page location
//! - A `Transport` seam with a tokio-tungstenite implementation
//! - `SocketClient`, which parses inbound frames, emits them, and
//!   reconnects after a fixed delay unless closed with a terminal code

pub mod client;
pub mod emitter;
pub mod events;
pub mod options;
pub mod transport;

// Re-export key types
pub use client::{OnOpen, SocketClient};
pub use emitter::{Disposer, EventEmitter};
pub use events::{ConnectionState, CssReload, OutboundMessage, ServerMessage, SocketPayload};
pub use options::{PageLocation, SocketOptions};
pub use transport::{Connection, InboundFrame, OutboundFrame, Transport, WebSocketTransport};
