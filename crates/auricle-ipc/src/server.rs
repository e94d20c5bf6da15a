//! IPC server implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, info, warn};

use crate::error::IpcResult;
use crate::events::{Event, EventType};
use crate::messages::{Method, Request, Response};

/// IPC server that listens for client connections.
pub struct IpcServer {
    listener: UnixListener,
    clients: Arc<RwLock<HashMap<u64, ClientHandle>>>,
    next_client_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
    request_tx: mpsc::Sender<(u64, Request, mpsc::Sender<Response>)>,
}

struct ClientHandle {
    /// Event types this client wants; empty means everything
    subscriptions: Vec<EventType>,
}

impl IpcServer {
    /// Create a new IPC server bound to the given socket path.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created.
    pub async fn bind(
        socket_path: &Path,
    ) -> IpcResult<(Self, mpsc::Receiver<(u64, Request, mpsc::Sender<Response>)>)> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Remove stale socket file if it exists
        if socket_path.exists() {
            tokio::fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(?socket_path, "IPC server listening");

        let (event_tx, _) = broadcast::channel(256);
        let (request_tx, request_rx) = mpsc::channel(64);

        Ok((
            Self {
                listener,
                clients: Arc::new(RwLock::new(HashMap::new())),
                next_client_id: AtomicU64::new(1),
                event_tx,
                request_tx,
            },
            request_rx,
        ))
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
                    info!(client_id, "Client connected");

                    let clients = Arc::clone(&self.clients);
                    let event_rx = self.event_tx.subscribe();
                    let request_tx = self.request_tx.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_client(client_id, stream, clients, event_rx, request_tx)
                                .await
                        {
                            error!(client_id, error = %e, "Client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                }
            }
        }
    }

    /// Broadcast an event to all subscribed clients.
    pub fn broadcast(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Get a clone of the event sender for broadcasting from other tasks.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    async fn handle_client(
        client_id: u64,
        stream: UnixStream,
        clients: Arc<RwLock<HashMap<u64, ClientHandle>>>,
        mut event_rx: broadcast::Receiver<Event>,
        request_tx: mpsc::Sender<(u64, Request, mpsc::Sender<Response>)>,
    ) -> IpcResult<()> {
        let (read_half, write_half) = stream.into_split();
        let mut lines_in = FramedRead::new(read_half, LinesCodec::new());
        let mut lines_out = FramedWrite::new(write_half, LinesCodec::new());

        let (response_tx, mut response_rx) = mpsc::channel::<Response>(16);

        // Register client
        {
            let mut clients = clients.write().await;
            clients.insert(client_id, ClientHandle { subscriptions: Vec::new() });
        }

        loop {
            tokio::select! {
                // Read request from client
                result = lines_in.next() => {
                    match result {
                        None => {
                            debug!(client_id, "Client disconnected");
                            break;
                        }
                        Some(Ok(line)) => {
                            if let Ok(request) = serde_json::from_str::<Request>(&line) {
                                debug!(client_id, request_id = request.id, "Received request");
                                match &request.method {
                                    // Subscription bookkeeping is per-connection
                                    // state; handle it here so filters apply.
                                    Method::Subscribe { events } => {
                                        Self::update_subscriptions(
                                            &clients, client_id, events, true,
                                        ).await;
                                        let _ = response_tx
                                            .send(success_response(request.id))
                                            .await;
                                    }
                                    Method::Unsubscribe { events } => {
                                        Self::update_subscriptions(
                                            &clients, client_id, events, false,
                                        ).await;
                                        let _ = response_tx
                                            .send(success_response(request.id))
                                            .await;
                                    }
                                    _ => {
                                        let _ = request_tx
                                            .send((client_id, request, response_tx.clone()))
                                            .await;
                                    }
                                }
                            } else {
                                warn!(client_id, "Invalid request format");
                            }
                        }
                        Some(Err(e)) => {
                            error!(client_id, error = %e, "Read error");
                            break;
                        }
                    }
                }

                // Send response to client
                Some(response) = response_rx.recv() => {
                    let json = serde_json::to_string(&response)?;
                    if let Err(e) = lines_out.send(json).await {
                        error!(client_id, error = %e, "Write error");
                        break;
                    }
                }

                // Forward events to client
                Ok(event) = event_rx.recv() => {
                    let wanted = {
                        let clients = clients.read().await;
                        clients.get(&client_id).is_some_and(|handle| {
                            handle.subscriptions.is_empty()
                                || handle.subscriptions.contains(&event.event)
                        })
                    };
                    if wanted {
                        let json = serde_json::to_string(&event)?;
                        if let Err(e) = lines_out.send(json).await {
                            error!(client_id, error = %e, "Event write error");
                            break;
                        }
                    }
                }
            }
        }

        // Unregister client
        {
            let mut clients = clients.write().await;
            clients.remove(&client_id);
        }

        info!(client_id, "Client handler exiting");
        Ok(())
    }

    async fn update_subscriptions(
        clients: &Arc<RwLock<HashMap<u64, ClientHandle>>>,
        client_id: u64,
        names: &[String],
        subscribe: bool,
    ) {
        let mut parsed = Vec::new();
        for name in names {
            match serde_json::from_value::<EventType>(serde_json::Value::String(name.clone())) {
                Ok(event_type) => parsed.push(event_type),
                Err(_) => warn!(client_id, name = %name, "Unknown event type"),
            }
        }

        let mut clients = clients.write().await;
        if let Some(handle) = clients.get_mut(&client_id) {
            if subscribe {
                for event_type in parsed {
                    if !handle.subscriptions.contains(&event_type) {
                        handle.subscriptions.push(event_type);
                    }
                }
            } else {
                handle.subscriptions.retain(|existing| !parsed.contains(existing));
            }
        }
    }
}

fn success_response(id: u64) -> Response {
    Response { id, result: Ok(serde_json::json!({ "success": true })) }
}
