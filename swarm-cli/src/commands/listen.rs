//! Listen command - print every payload pushed by the server.

use std::sync::Arc;

use console::style;

use swarm_core::config::ConfigHandle;
use swarm_core::error::{SwarmError, SwarmResult};
use swarm_socket::{OnOpen, SocketClient, SocketPayload};

use super::SocketArgs;
use crate::OutputFormat;

/// Run the listen command.
pub async fn run(config: ConfigHandle, args: SocketArgs, format: OutputFormat) -> SwarmResult<()> {
    let client = super::create_client(&config, &args, None).await;

    println!("Connecting to {}...", style(client.url()).bold());

    let _payloads = client.on(move |payload: &SocketPayload| super::print_payload(payload, format));
    let _errors = client.on_error(|err: &SwarmError| {
        eprintln!("  {} {err}", style("ERR").red().bold());
    });

    let on_open: OnOpen = Arc::new(|client: &SocketClient| {
        println!(
            "  {} Connected to {}. Listening... (Ctrl+C to stop)",
            style("OK").green().bold(),
            client.url()
        );
    });
    client.connect(Some(on_open));

    super::wait_for_shutdown(&client).await;
    Ok(())
}
