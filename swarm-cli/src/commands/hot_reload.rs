//! Hot reload command - apply CSS and page reloads to a styles directory.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;

use swarm_core::config::ConfigHandle;
use swarm_core::error::{SwarmError, SwarmResult};
use swarm_reload::{DirectoryDocument, HotReloader};
use swarm_socket::{OnOpen, SocketClient};

use super::SocketArgs;

/// Run the hot-reload command.
pub async fn run(
    config: ConfigHandle,
    args: SocketArgs,
    styles_dir: Option<PathBuf>,
    on_reload: Option<String>,
) -> SwarmResult<()> {
    let hot_reload = config.read().await.hot_reload.clone();
    let styles_dir = styles_dir.unwrap_or_else(|| PathBuf::from(&hot_reload.styles_dir));
    let on_reload = on_reload.or(hot_reload.on_reload);

    let mut document = DirectoryDocument::new(&styles_dir);
    if let Some(command) = &on_reload {
        document = document.on_reload(command.clone());
    }

    let client = super::create_client(&config, &args, Some(hot_reload.socket_path)).await;
    let reloader = HotReloader::new(document);
    let _attached = reloader.attach(&client);
    let _errors = client.on_error(|err: &SwarmError| {
        eprintln!("  {} {err}", style("ERR").red().bold());
    });

    println!(
        "Hot reloading styles into {} from {}",
        style(styles_dir.display()).bold(),
        style(client.url()).bold()
    );
    let on_open: OnOpen = Arc::new(|_: &SocketClient| {
        println!("  {} Connected. Waiting for changes... (Ctrl+C to stop)", style("OK").green().bold());
    });
    client.connect(Some(on_open));

    super::wait_for_shutdown(&client).await;
    println!("  {} page reload(s) applied", reloader.document().reload_count());
    Ok(())
}
