//! swarm CLI - listen to a dev server's socket and apply hot reloads.
//!
//! Connects to the dev server's WebSocket endpoint, prints or applies the
//! payloads it pushes, and reconnects whenever the connection drops.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use swarm_core::config::{ConfigHandle, SwarmConfig};
use swarm_core::error::SwarmResult;
use swarm_core::logging;

/// swarm - dev server socket client.
#[derive(Parser)]
#[command(
    name = "swarm",
    version,
    about = "Dev server socket client with hot reload",
    long_about = "Connects to a swarm dev server's WebSocket endpoint.\n\
                  Prints pushed payloads, sends events, or applies CSS and page reloads."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print every payload the server pushes.
    Listen {
        #[command(flatten)]
        socket: commands::SocketArgs,
    },
    /// Connect, send one event once the socket is open, then close.
    Send {
        /// Event name.
        event: String,
        /// Event data as JSON (defaults to `{}`).
        #[arg(short, long)]
        data: Option<String>,
        /// Seconds to wait for the connection to open.
        #[arg(long, default_value = "10")]
        timeout: u64,
        #[command(flatten)]
        socket: commands::SocketArgs,
    },
    /// Apply CSS and page reloads pushed by the dev server.
    HotReload {
        /// Directory receiving one `<id>.css` file per style element (overrides config).
        #[arg(short, long)]
        styles_dir: Option<PathBuf>,
        /// Shell command run on a full page reload (overrides config).
        #[arg(long)]
        on_reload: Option<String>,
        #[command(flatten)]
        socket: commands::SocketArgs,
    },
}

#[tokio::main]
async fn main() -> SwarmResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = SwarmConfig::load(cli.config.as_deref().map(Path::new))?;

    // Initialize logging
    let log_level = cli.verbose.then_some("debug");
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let _guard = match logging::init_logging(&config.logging, &log_dir, log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_console_logging(log_level.unwrap_or(&config.logging.level));
            warn!("file logging unavailable, logging to stderr only: {e}");
            None
        }
    };

    let config_handle = ConfigHandle::new(config);

    info!("swarm CLI v{}", swarm_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Listen { socket } => {
            commands::listen::run(config_handle, socket, cli.format).await
        }
        Commands::Send {
            event,
            data,
            timeout,
            socket,
        } => commands::send::run(config_handle, socket, event, data, timeout, cli.format).await,
        Commands::HotReload {
            styles_dir,
            on_reload,
            socket,
        } => commands::hot_reload::run(config_handle, socket, styles_dir, on_reload).await,
    }
}
