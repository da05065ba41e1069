//! Swarm Core - Foundation types shared by the live-reload client crates.
//!
//! This crate provides:
//! - Client configuration (socket target, page location, logging, hot reload)
//! - The unified error type
//! - Structured logging with tracing
//! - Platform directory lookup
//! - Protocol constants (paths, close codes, delays)

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::{ConfigHandle, SwarmConfig};
pub use error::{SwarmError, SwarmResult};
pub use logging::init_logging;
pub use platform::Platform;
