//! CLI command implementations.

pub mod hot_reload;
pub mod listen;
pub mod send;

use clap::Args;
use console::style;

use swarm_core::config::ConfigHandle;
use swarm_socket::{ConnectionState, PageLocation, SocketClient, SocketOptions, SocketPayload};

use crate::OutputFormat;

/// Socket target overrides shared by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct SocketArgs {
    /// Full socket URL (overrides every other target option).
    #[arg(long)]
    pub uri: Option<String>,
    /// Socket URL used verbatim when `--uri` is not given.
    #[arg(long)]
    pub host: Option<String>,
    /// Port (defaults to the page port).
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Socket path appended to the derived URL.
    #[arg(long)]
    pub path: Option<String>,
}

impl SocketArgs {
    /// Layer these overrides on top of `options`.
    pub fn apply(&self, mut options: SocketOptions) -> SocketOptions {
        if let Some(uri) = &self.uri {
            options = options.uri(uri.clone());
        }
        if let Some(host) = &self.host {
            options = options.host(host.clone());
        }
        if let Some(port) = self.port {
            options = options.port(port);
        }
        if let Some(path) = &self.path {
            options = options.path(path.clone());
        }
        options
    }
}

/// Build a client from config plus command-line overrides.
///
/// `path` replaces the configured socket path before the overrides apply.
pub async fn create_client(
    config: &ConfigHandle,
    args: &SocketArgs,
    path: Option<String>,
) -> SocketClient {
    let cfg = config.read().await;
    let mut options = SocketOptions::from_config(&cfg.socket);
    if let Some(path) = path {
        options = options.path(path);
    }
    let options = args.apply(options);
    SocketClient::new(&options, &PageLocation::from_config(&cfg.page))
}

/// Print one payload in the requested format.
pub fn print_payload(payload: &SocketPayload, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!(
                "  {} {}",
                style(format!("[{}]", payload.kind)).cyan(),
                payload.data
            );
        }
        OutputFormat::Json => match payload.to_frame() {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("failed to encode payload: {e}"),
        },
    }
}

/// Wait until Ctrl+C or until the client closes for good.
pub async fn wait_for_shutdown(client: &SocketClient) {
    let mut states = client.state_receiver();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\n  Disconnecting...");
            client.close();
        }
        _ = states.wait_for(|state| *state == ConnectionState::Closed) => {
            println!(
                "  {} Server closed the connection for good.",
                style("STOP").red().bold()
            );
        }
    }
}
