//! IPC client implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, warn};

use crate::error::{IpcError, IpcResult};
use crate::events::Event;
use crate::messages::{Method, Request, Response};

/// IPC client for connecting to the Auricle daemon.
pub struct IpcClient {
    writer: Arc<Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>>,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>,
    event_rx: mpsc::Receiver<Event>,
}

impl IpcClient {
    /// Connect to the daemon at the given socket path.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(socket_path: &Path) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::channel(64);

        // Spawn reader task
        let pending_clone = Arc::clone(&pending);
        tokio::spawn(async move {
            let mut lines_in = FramedRead::new(read_half, LinesCodec::new());

            loop {
                match lines_in.next().await {
                    None => {
                        debug!("Connection closed");
                        break;
                    }
                    Some(Ok(line)) => {
                        // Try to parse as response first
                        if let Ok(response) = serde_json::from_str::<Response>(&line) {
                            let mut pending = pending_clone.lock().await;
                            if let Some(tx) = pending.remove(&response.id) {
                                let _ = tx.send(response);
                            }
                        }
                        // Try to parse as event
                        else if let Ok(event) = serde_json::from_str::<Event>(&line) {
                            let _ = event_tx.send(event).await;
                        } else {
                            warn!("Unknown message format");
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Read error");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            writer: Arc::new(Mutex::new(FramedWrite::new(write_half, LinesCodec::new()))),
            next_id: AtomicU64::new(1),
            pending,
            event_rx,
        })
    }

    /// Connect to the daemon at the default socket path.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect_default() -> IpcResult<Self> {
        Self::connect(&crate::socket_path()).await
    }

    /// Send a request and wait for a response.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn request(&self, method: Method) -> IpcResult<Response> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request { id, method };

        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let json = serde_json::to_string(&request)?;

        {
            let mut writer = self.writer.lock().await;
            writer.send(json).await?;
        }

        rx.await.map_err(|_| IpcError::ChannelClosed)
    }

    /// Get the event receiver for incoming events.
    pub fn events(&mut self) -> &mut mpsc::Receiver<Event> {
        &mut self.event_rx
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::events::EventType;
    use crate::server::IpcServer;

    use super::*;

    #[tokio::test]
    async fn request_response_and_event_delivery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("auricle-test.sock");

        let (server, mut request_rx) = IpcServer::bind(&socket).await.expect("bind");
        let event_tx = server.event_sender();
        tokio::spawn(async move { server.run().await });

        // Service forwarded requests with a canned payload
        tokio::spawn(async move {
            while let Some((_client_id, request, response_tx)) = request_rx.recv().await {
                let response =
                    Response { id: request.id, result: Ok(json!({ "route": "none" })) };
                let _ = response_tx.send(response).await;
            }
        });

        let mut client = IpcClient::connect(&socket).await.expect("connect");

        let response = client.request(Method::GetRoute).await.expect("request");
        assert_eq!(response.result.expect("success")["route"], "none");

        // Subscribe is answered by the connection handler itself
        let response = client
            .request(Method::Subscribe { events: vec!["route_changed".to_string()] })
            .await
            .expect("subscribe");
        assert!(response.result.is_ok());

        let _ = event_tx.send(Event {
            event: EventType::RouteChanged,
            data: json!({ "route": "wired" }),
        });

        let event = client.events().recv().await.expect("event");
        assert_eq!(event.event, EventType::RouteChanged);
        assert_eq!(event.data["route"], "wired");
    }

    #[tokio::test]
    async fn invalid_lines_are_ignored_by_the_server() {
        use tokio::io::AsyncWriteExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("auricle-test.sock");

        let (server, _request_rx) = IpcServer::bind(&socket).await.expect("bind");
        tokio::spawn(async move { server.run().await });

        // A raw client feeding garbage must not take the server down
        let mut stream = UnixStream::connect(&socket).await.expect("connect");
        stream.write_all(b"not json at all\n").await.expect("write");

        // A real client still works afterwards
        let client = IpcClient::connect(&socket).await.expect("connect");
        drop(client);
    }
}
