//! hotkeys-daemon: serves the hotkey engine over a Unix socket
//!
//! An event bridge (browser extension, window-system hook) forwards
//! normalized key events as `dispatch` requests and suppresses the host's
//! default action when the daemon reports a match. Bindings come from the
//! JSON bindings file; each fired action is pushed to subscribed clients.

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotkeys::config::{BindingsFile, Config};
use hotkeys::events::HotkeyEvent;
use hotkeys::hotkey::HotKeys;
use hotkeys::ipc::Server;
use hotkeys::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "hotkeys-daemon starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.bindings_path,
        window_ms = config.double_tap_window.as_millis() as u64,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();
    let hotkeys = HotKeys::with_double_tap_window(config.double_tap_window);

    // Fired actions -> subscribed IPC clients
    let (event_tx, _event_rx) = broadcast::channel::<HotkeyEvent>(64);

    // Held for the daemon's lifetime
    let _bindings = match BindingsFile::load(&config.bindings_path)? {
        Some(file) => Some(file.apply(&hotkeys, &event_tx)?),
        None => {
            warn!(
                path = %config.bindings_path.display(),
                "no bindings file, starting with an empty registry"
            );
            None
        }
    };

    let server = Server::new(&config.socket_path, hotkeys, event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to install signal handlers"),
            }
        }
    }

    info!("shutting down...");
    server.shutdown().await;
    info!("hotkeys-daemon stopped");

    Ok(())
}
