//! Networking coordinator between the TUI loop and the async transport.
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ─────  tokio background tasks
//!                     ─── ClientEvent →   (emit over the transport)
//!                     ─── NetCommand →    (uploads, downloads, shutdown)
//! ```
//!
//! The main thread owns the [`crate::chat::ChatClient`]; it pushes emitted
//! events and commands into bounded channels and drains [`NetEvent`]s on each
//! tick of its poll loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use duochat_proto::event::{ClientEvent, ServerEvent};

use crate::chat::ledger::EntryId;
use crate::chat::upload::{self, UploadJob};
use crate::transport::socket::SocketTransport;
use crate::transport::{Transport, TransportError};

/// Commands sent from the TUI main loop to the background tasks.
#[derive(Debug)]
pub enum NetCommand {
    /// Upload one file; the outcome arrives as `file-shared` or
    /// [`NetEvent::UploadFailed`].
    Upload(UploadJob),
    /// Fetch a shared file into the download directory.
    Download {
        /// Absolute URL of the file.
        url: Url,
        /// Name to save the file under.
        file_name: String,
    },
    /// Stop the command handler.
    Shutdown,
}

/// Events sent from the background tasks to the TUI main loop.
#[derive(Debug)]
pub enum NetEvent {
    /// An event from the chat server.
    Server(ServerEvent),
    /// An emitted event could not be written to the connection.
    EmitFailed {
        /// The event that was lost.
        event: ClientEvent,
        /// Why it failed.
        reason: String,
    },
    /// An upload did not complete.
    UploadFailed {
        /// Placeholder of the failed upload.
        temp_id: EntryId,
        /// File name for the notification.
        file_name: String,
        /// Why it failed.
        reason: String,
    },
    /// A download finished.
    Downloaded {
        /// Where the file was written.
        path: PathBuf,
    },
    /// A download did not complete.
    DownloadFailed {
        /// File that was requested.
        file_name: String,
        /// Why it failed.
        reason: String,
    },
    /// Connection status update.
    ConnectionStatus {
        /// Whether the connection is up.
        connected: bool,
    },
    /// A non-fatal networking error.
    Error(String),
}

/// Configuration for the networking layer.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// WebSocket URL of the chat server (e.g. `ws://127.0.0.1:3000/ws`).
    pub socket_url: String,
    /// Multipart upload endpoint.
    pub upload_url: Url,
    /// Directory downloads are written to.
    pub download_dir: PathBuf,
    /// Timeout for the WebSocket connect and handshake.
    pub connect_timeout: Duration,
    /// Capacity of the command, outbound and event channels.
    pub channel_capacity: usize,
}

/// Default channel capacity for commands and events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default connect/handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

impl NetConfig {
    /// A `NetConfig` with default timeout and channel capacity.
    #[must_use]
    pub const fn new(socket_url: String, upload_url: Url, download_dir: PathBuf) -> Self {
        Self {
            socket_url,
            upload_url,
            download_dir,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Channel handles returned by [`spawn_net`].
#[derive(Debug)]
pub struct NetHandle {
    /// Identifier the server assigned to this connection.
    pub local_id: String,
    /// Events for the transport to emit.
    pub outbound: mpsc::Sender<ClientEvent>,
    /// Upload/download/shutdown commands.
    pub commands: mpsc::Sender<NetCommand>,
    /// Everything the TUI needs to react to.
    pub events: mpsc::Receiver<NetEvent>,
}

/// Connect to the chat server and spawn the background tasks.
///
/// # Errors
///
/// Returns the [`TransportError`] from connecting; the caller should fall
/// back to offline mode.
pub async fn spawn_net(config: NetConfig) -> Result<NetHandle, TransportError> {
    let transport = SocketTransport::connect(&config.socket_url, config.connect_timeout).await?;
    Ok(spawn_net_with(transport, &config))
}

/// Spawn the background tasks over an already connected transport.
///
/// Must be called from within a tokio runtime. Spawns:
///
/// 1. a **receive loop** forwarding server events as [`NetEvent::Server`],
/// 2. an **outbound forwarder** emitting queued [`ClientEvent`]s,
/// 3. a **command handler** running each upload and download as its own
///    task so one transfer never blocks or fails another.
pub fn spawn_net_with<T: Transport + 'static>(transport: T, config: &NetConfig) -> NetHandle {
    let transport = Arc::new(transport);
    let local_id = transport.local_id().to_string();

    let (out_tx, out_rx) = mpsc::channel::<ClientEvent>(config.channel_capacity);
    let (cmd_tx, cmd_rx) = mpsc::channel::<NetCommand>(config.channel_capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(config.channel_capacity);

    let _ = evt_tx.try_send(NetEvent::ConnectionStatus {
        connected: transport.is_connected(),
    });

    tokio::spawn(receive_loop(Arc::clone(&transport), evt_tx.clone()));
    tokio::spawn(outbound_forwarder(transport, out_rx, evt_tx.clone()));
    tokio::spawn(command_handler(
        reqwest::Client::new(),
        config.clone(),
        cmd_rx,
        evt_tx,
    ));

    NetHandle {
        local_id,
        outbound: out_tx,
        commands: cmd_tx,
        events: evt_rx,
    }
}

/// Background task: forward server events until the connection closes.
async fn receive_loop<T: Transport>(transport: Arc<T>, evt_tx: mpsc::Sender<NetEvent>) {
    loop {
        match transport.recv().await {
            Ok(event) => {
                if evt_tx.send(NetEvent::Server(event)).await.is_err() {
                    break;
                }
            }
            Err(TransportError::ConnectionClosed) => {
                tracing::info!("server connection closed");
                let _ = evt_tx
                    .send(NetEvent::ConnectionStatus { connected: false })
                    .await;
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "receive error");
            }
        }
    }
}

/// Background task: emit queued events in order.
async fn outbound_forwarder<T: Transport>(
    transport: Arc<T>,
    mut out_rx: mpsc::Receiver<ClientEvent>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    while let Some(event) = out_rx.recv().await {
        if let Err(e) = transport.emit(&event).await {
            tracing::warn!(event = event.name(), error = %e, "emit failed");
            let failed = NetEvent::EmitFailed {
                event,
                reason: e.to_string(),
            };
            if evt_tx.send(failed).await.is_err() {
                break;
            }
        }
    }
    tracing::debug!("outbound forwarder exiting");
}

/// Background task: run uploads and downloads.
async fn command_handler(
    http: reqwest::Client,
    config: NetConfig,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            NetCommand::Upload(job) => {
                let http = http.clone();
                let endpoint = config.upload_url.clone();
                let evt_tx = evt_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = upload::upload_file(&http, &endpoint, &job).await {
                        tracing::warn!(temp_id = %job.temp_id, error = %e, "upload failed");
                        let _ = evt_tx
                            .send(NetEvent::UploadFailed {
                                temp_id: job.temp_id,
                                file_name: job.file_name,
                                reason: e.to_string(),
                            })
                            .await;
                    }
                });
            }
            NetCommand::Download { url, file_name } => {
                let http = http.clone();
                let dir = config.download_dir.clone();
                let evt_tx = evt_tx.clone();
                tokio::spawn(async move {
                    let event = match upload::download_file(&http, url, &dir, &file_name).await {
                        Ok(path) => NetEvent::Downloaded { path },
                        Err(e) => {
                            tracing::warn!(file = %file_name, error = %e, "download failed");
                            NetEvent::DownloadFailed {
                                file_name,
                                reason: e.to_string(),
                            }
                        }
                    };
                    let _ = evt_tx.send(event).await;
                });
            }
            NetCommand::Shutdown => {
                tracing::info!("net command handler shutting down");
                break;
            }
        }
    }
}
