//! Socket URL derivation.
//!
//! The target URL is taken from an explicit `uri`, else from `host` used
//! verbatim, else built from the page location: `ws://` or `wss://` depending
//! on the page protocol, the page host name (`localhost` when empty), the
//! configured port or the page port, and the socket path. Nothing is
//! validated here; a malformed URL only fails when the connection is opened.

use std::time::Duration;

use swarm_core::config::{PageConfig, SocketConfig};
use swarm_core::constants;

/// Location of the page the client is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Protocol including the trailing colon, e.g. `"https:"`.
    pub protocol: String,
    /// Host name; may be empty.
    pub hostname: String,
    /// Port.
    pub port: u16,
}

impl PageLocation {
    pub fn new(protocol: impl Into<String>, hostname: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            port,
        }
    }

    pub fn from_config(config: &PageConfig) -> Self {
        Self::new(config.protocol.clone(), config.hostname.clone(), config.port)
    }

    /// Socket scheme matching the page protocol.
    pub fn socket_scheme(&self) -> &'static str {
        if self.protocol == "https:" {
            "wss://"
        } else {
            "ws://"
        }
    }
}

impl Default for PageLocation {
    fn default() -> Self {
        Self::from_config(&PageConfig::default())
    }
}

/// Options for constructing a [`SocketClient`](crate::SocketClient).
#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub uri: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub reconnect_delay: Duration,
    /// Time allowed for opening a connection.
    pub connect_timeout: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            uri: None,
            host: None,
            port: None,
            path: constants::DEFAULT_SOCKET_PATH.to_string(),
            reconnect_delay: Duration::from_millis(constants::SOCKET_RECONNECT_DELAY_MS),
            connect_timeout: Duration::from_millis(constants::SOCKET_CONNECT_TIMEOUT_MS),
        }
    }
}

impl SocketOptions {
    /// Options for the general-purpose client (`/ws`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the dev server's hot reload endpoint (`/__swarm__/ws`).
    pub fn hot_reload() -> Self {
        Self::default().path(constants::HOT_RELOAD_SOCKET_PATH)
    }

    /// Options from the `[socket]` config section.
    pub fn from_config(config: &SocketConfig) -> Self {
        Self {
            uri: config.uri.clone(),
            host: config.host.clone(),
            port: config.port,
            path: config.path.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Derive the socket URL against `page`.
    pub fn resolve_url(&self, page: &PageLocation) -> String {
        if let Some(uri) = &self.uri {
            return uri.clone();
        }
        if let Some(host) = &self.host {
            return host.clone();
        }

        let hostname = if page.hostname.is_empty() {
            "localhost"
        } else {
            page.hostname.as_str()
        };
        let port = self.port.unwrap_or(page.port);
        format!("{}{hostname}:{port}{}", page.socket_scheme(), self.path)
    }
}
