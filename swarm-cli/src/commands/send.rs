//! Send command - send one event as soon as the socket opens.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::sync::mpsc;

use swarm_core::config::ConfigHandle;
use swarm_core::error::{SwarmError, SwarmResult};
use swarm_socket::{OnOpen, SocketClient};

use super::SocketArgs;
use crate::OutputFormat;

/// Time given to the connection to flush the event and the close frame.
const CLOSE_GRACE: Duration = Duration::from_millis(200);

/// Run the send command.
pub async fn run(
    config: ConfigHandle,
    args: SocketArgs,
    event: String,
    data: Option<String>,
    timeout_secs: u64,
    format: OutputFormat,
) -> SwarmResult<()> {
    let data = data
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    let client = super::create_client(&config, &args, None).await;

    let (opened_tx, mut opened) = mpsc::unbounded_channel::<()>();
    let on_open: OnOpen = Arc::new(move |_: &SocketClient| {
        let _ = opened_tx.send(());
    });
    client.connect(Some(on_open));

    let waited = tokio::time::timeout(Duration::from_secs(timeout_secs), opened.recv()).await;
    if waited.is_err() {
        client.close();
        return Err(SwarmError::Socket(format!(
            "no connection to {} within {timeout_secs}s",
            client.url()
        )));
    }

    let sent = client.send(&event, data)?;
    client.close();
    tokio::time::sleep(CLOSE_GRACE).await;

    match format {
        OutputFormat::Text if sent => {
            println!("  {} Sent '{event}' to {}", style("OK").green().bold(), client.url());
        }
        OutputFormat::Text => {
            println!("  {} Socket closed before '{event}' could be sent", style("WARN").yellow());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "event": event, "sent": sent }));
        }
    }
    Ok(())
}
