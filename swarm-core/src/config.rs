//! Client configuration management.
//!
//! Holds the socket target, the location of the page the client is attached
//! to, logging settings and hot reload settings. Configuration is persisted
//! as TOML on disk; every section and field has a default so that partial
//! files load.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants;
use crate::error::{SwarmError, SwarmResult};
use crate::platform::Platform;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Socket connection settings.
    #[serde(default)]
    pub socket: SocketConfig,

    /// Location of the page the client runs against.
    #[serde(default)]
    pub page: PageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Hot reload settings.
    #[serde(default)]
    pub hot_reload: HotReloadConfig,
}

/// Socket connection configuration.
///
/// Precedence when deriving the target URL: `uri`, then `host`, then the
/// page location combined with `port` and `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Full socket URL. Overrides everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Socket URL used verbatim when `uri` is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port override. Falls back to the page port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Path appended to the derived URL.
    #[serde(default = "default_socket_path")]
    pub path: String,

    /// Fixed delay before each reconnect attempt.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Time allowed for opening a connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Location of the page, the native stand-in for `window.location`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page protocol including the trailing colon, e.g. `"https:"`.
    #[serde(default = "default_page_protocol")]
    pub protocol: String,

    /// Page host name. Empty means `localhost`.
    #[serde(default = "default_page_hostname")]
    pub hostname: String,

    /// Page port.
    #[serde(default = "default_page_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses the default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output for the log file.
    #[serde(default)]
    pub json_output: bool,
}

/// Hot reload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotReloadConfig {
    /// Directory that receives one `<id>.css` file per style element.
    #[serde(default = "default_styles_dir")]
    pub styles_dir: String,

    /// Shell command run on a full page reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_reload: Option<String>,

    /// Socket path of the hot reload endpoint.
    #[serde(default = "default_hot_reload_path")]
    pub socket_path: String,
}

// Default value functions for serde

fn default_socket_path() -> String {
    constants::DEFAULT_SOCKET_PATH.to_string()
}

fn default_reconnect_delay() -> u64 {
    constants::SOCKET_RECONNECT_DELAY_MS
}

fn default_connect_timeout() -> u64 {
    constants::SOCKET_CONNECT_TIMEOUT_MS
}

fn default_page_protocol() -> String {
    "http:".to_string()
}

fn default_page_hostname() -> String {
    "localhost".to_string()
}

fn default_page_port() -> u16 {
    constants::DEFAULT_PAGE_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_hot_reload_path() -> String {
    constants::HOT_RELOAD_SOCKET_PATH.to_string()
}

fn default_styles_dir() -> String {
    "styles".to_string()
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            uri: None,
            host: None,
            port: None,
            path: default_socket_path(),
            reconnect_delay_ms: default_reconnect_delay(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            protocol: default_page_protocol(),
            hostname: default_page_hostname(),
            port: default_page_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            styles_dir: default_styles_dir(),
            on_reload: None,
            socket_path: default_hot_reload_path(),
        }
    }
}

impl SwarmConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. A missing default file yields the defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> SwarmResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> SwarmResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SwarmConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> SwarmResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SwarmError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> SwarmResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> SwarmResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(Platform::data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }
}

/// Thread-safe configuration holder for shared access.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<SwarmConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, SwarmConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, SwarmConfig> {
        self.inner.write().await
    }
}
