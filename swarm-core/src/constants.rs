//! Protocol and application constants.

/// Application name.
pub const APP_NAME: &str = "swarm";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Virtual path prefix under which the dev server exposes its own endpoints.
pub const SWARM_VIRTUAL_PATH: &str = "/__swarm__";

/// Socket path used by the general-purpose client.
pub const DEFAULT_SOCKET_PATH: &str = "/ws";

/// Socket path of the dev server's hot reload endpoint.
pub const HOT_RELOAD_SOCKET_PATH: &str = "/__swarm__/ws";

/// Port the dev server listens on when none is configured.
pub const DEFAULT_PAGE_PORT: u16 = 8080;

/// Fixed delay before a reconnect attempt, in milliseconds.
pub const SOCKET_RECONNECT_DELAY_MS: u64 = 5_000;

/// Time allowed for a connection attempt before it counts as failed, in milliseconds.
pub const SOCKET_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Close code after which the client never reconnects
/// (server terminating due to an internal error).
pub const TERMINAL_CLOSE_CODE: u16 = 1011;

/// Close code reported when a connection ends without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code sent by the client on an explicit close.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Inbound message types pushed by the dev server.
pub mod message_types {
    /// Replace or insert a single style element.
    pub const RELOAD_CSS: &str = "reload-css";
    /// Reload the whole page.
    pub const RELOAD: &str = "reload";
}
