//! Wire payloads exchanged with the dev server and the client connection state.
//!
//! Inbound frames are `{"type": string, "data": string}` envelopes. `data` is
//! opaque at this level; for `reload-css` it carries a second JSON document
//! with the style element id and its CSS. Outbound frames are
//! `{"event": string, "data": object}`.

use serde::{Deserialize, Serialize};

use swarm_core::constants::message_types;
use swarm_core::error::{SwarmError, SwarmResult};

/// Inbound message envelope pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketPayload {
    /// Message type, e.g. `reload-css` or `reload`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque data string, often itself JSON.
    #[serde(default)]
    pub data: String,
}

impl SocketPayload {
    /// Build a payload from its parts.
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// The payload the server sends to request a full page reload.
    pub fn reload() -> Self {
        Self::new(message_types::RELOAD, "")
    }

    /// Parse a raw text frame.
    ///
    /// Empty frames carry nothing and yield `Ok(None)`.
    pub fn from_frame(frame: &str) -> SwarmResult<Option<Self>> {
        if frame.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(frame)
            .map(Some)
            .map_err(|e| SwarmError::Payload(format!("frame is not a payload: {e}")))
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> SwarmResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode into the typed message keyed by `type`.
    ///
    /// Unknown types are preserved as [`ServerMessage::Other`]; only a
    /// `reload-css` payload with malformed data is an error.
    pub fn decode(&self) -> SwarmResult<ServerMessage> {
        match self.kind.as_str() {
            message_types::RELOAD_CSS => {
                let reload: CssReload = serde_json::from_str(&self.data).map_err(|e| {
                    SwarmError::Payload(format!("{} data is not {{id, css}}: {e}", self.kind))
                })?;
                Ok(ServerMessage::ReloadCss(reload))
            }
            message_types::RELOAD => Ok(ServerMessage::Reload),
            _ => Ok(ServerMessage::Other {
                kind: self.kind.clone(),
                data: self.data.clone(),
            }),
        }
    }
}

/// Data of a `reload-css` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssReload {
    /// Id of the style element to create or replace.
    pub id: String,
    /// Full CSS text of the element.
    pub css: String,
}

/// Typed view of an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Replace or create one style element.
    ReloadCss(CssReload),
    /// Reload the whole page.
    Reload,
    /// Any type this client does not act on.
    Other { kind: String, data: String },
}

impl ServerMessage {
    /// The wire `type` of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::ReloadCss(_) => message_types::RELOAD_CSS,
            Self::Reload => message_types::RELOAD,
            Self::Other { kind, .. } => kind,
        }
    }
}

/// Outbound message sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Event name.
    pub event: String,
    /// Event data; an empty object when none was given.
    pub data: serde_json::Value,
}

impl OutboundMessage {
    /// Build an outbound message, defaulting `data` to `{}`.
    pub fn new(event: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            event: event.into(),
            data: data.unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        }
    }
}

/// Connection state of a [`SocketClient`](crate::SocketClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Constructed, `connect` not called yet.
    #[default]
    Idle,
    /// Opening a connection.
    Connecting,
    /// Connected; sends are transmitted.
    Open,
    /// Connection lost, waiting out the reconnect delay.
    Reconnecting,
    /// Closed by the client or by a terminal close code. No reconnect pending.
    Closed,
}

impl ConnectionState {
    /// Whether a driver is active for this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
