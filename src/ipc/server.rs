//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of fired
//! hotkey actions to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::HotkeyEvent;
use crate::hotkey::HotKeys;

use super::protocol::{read_frame, write_message, DaemonStatus, Notification, Request, Response};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Notification task of a subscribed client, aborted when dropped
struct Forwarder(JoinHandle<()>);

impl Drop for Forwarder {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// State shared by every client handler
struct Shared {
    hotkeys: HotKeys,
    events: broadcast::Sender<HotkeyEvent>,
    start_time: Instant,
    events_handled: AtomicU64,
}

impl Server {
    /// Create a new IPC server dispatching into `hotkeys`
    ///
    /// Subscribed clients receive everything published on `events`.
    pub fn new(
        socket_path: &Path,
        hotkeys: HotKeys,
        events: broadcast::Sender<HotkeyEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Arc::new(Shared {
                hotkeys,
                events,
                start_time: Instant::now(),
                events_handled: AtomicU64::new(0),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let writer = Arc::new(Mutex::new(writer));
        let mut forwarder = None;

        loop {
            let frame = match read_frame(&mut reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.context("failed to read request")),
            };

            let (response, subscribe) = match serde_json::from_slice::<Request>(&frame) {
                Ok(request) => {
                    debug!(?request, "received request");
                    let subscribe = matches!(request, Request::Subscribe);
                    (Self::process_request(request, &shared), subscribe)
                }
                Err(e) => {
                    warn!(%e, "malformed request");
                    let response = Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    };
                    (response, false)
                }
            };

            // Receive from before the confirmation goes out
            let events = (subscribe && forwarder.is_none()).then(|| shared.events.subscribe());

            write_message(&mut *writer.lock().await, &response).await?;

            if let Some(events) = events {
                debug!("client subscribed to notifications");
                forwarder = Some(Forwarder(tokio::spawn(Self::forward_notifications(
                    events,
                    Arc::clone(&writer),
                ))));
            }
        }
    }

    /// Push hotkey events to a subscribed client until either side goes away
    async fn forward_notifications(
        mut events: broadcast::Receiver<HotkeyEvent>,
        writer: Arc<Mutex<OwnedWriteHalf>>,
    ) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let notification = Notification::Hotkey { event };
                    if let Err(e) = write_message(&mut *writer.lock().await, &notification).await {
                        debug!(?e, "subscriber went away");
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Process a request and return a response
    fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::Dispatch { mut event, focused } => {
                if let Some(focused) = focused {
                    event.context = focused.classify();
                }
                let outcome = shared.hotkeys.handle_key_event(&event);
                shared.events_handled.fetch_add(1, Ordering::Relaxed);

                for error in &outcome.errors {
                    let _ = shared.events.send(HotkeyEvent::ActionFailed {
                        trigger: error.trigger().to_string(),
                        message: error.to_string(),
                    });
                }

                Response::from(&outcome)
            }

            Request::ListBindings => Response::Bindings {
                bindings: shared
                    .hotkeys
                    .snapshot_active()
                    .iter()
                    .map(|binding| binding.info())
                    .collect(),
            },

            Request::GetStatus => Response::Status(DaemonStatus {
                active_bindings: shared.hotkeys.snapshot_active().len(),
                double_tap_window_ms: shared.hotkeys.double_tap_window().as_millis() as u64,
                events_handled: shared.events_handled.load(Ordering::Relaxed),
                uptime_secs: shared.start_time.elapsed().as_secs(),
                ..DaemonStatus::default()
            }),

            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}
