//! Auricle Daemon - audio route detection service.
//!
//! Watches the configured platform host for output-device changes,
//! reconciles them into a single authoritative route, and serves route
//! state and change events to IPC clients.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod server;

use auricle_host::{AudioHost, NullHost, RouteWatcher};
use auricle_ipc::{Event, EventType, IpcServer, Response, RoutePayload, socket_path};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("auricle=info".parse()?)
                .add_directive("auricle_daemon=debug".parse()?)
                .add_directive("auricle_host=debug".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Auricle daemon");

    // Load configuration
    let config = config::load_config()?;
    info!(backend = ?config.host.backend, "Configuration loaded");

    // Select the host backend
    let host: Arc<dyn AudioHost> = match config.host.backend {
        config::HostBackend::Null => Arc::new(NullHost::new()),
    };

    // Start the route watcher
    let (subscription, mut route_rx) = RouteWatcher::start(host, config.route.watcher_config())
        .context("Failed to start route watcher")?;
    info!(route = subscription.current().route.label(), "Route watcher started");

    // Start IPC server
    let socket = socket_path();
    info!(?socket, "Starting IPC server");
    let (ipc_server, mut request_rx) =
        IpcServer::bind(&socket).await.context("Failed to start IPC server")?;

    // Get event sender for broadcasting events to IPC clients
    let event_tx = ipc_server.event_sender();

    // Spawn IPC server task
    let ipc_handle = tokio::spawn(async move {
        ipc_server.run().await;
    });

    // Set up signal streams for graceful shutdown
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    info!("Daemon running. Press Ctrl+C to exit.");

    // Main event loop
    loop {
        tokio::select! {
            // Route transitions from the watcher
            maybe_state = route_rx.recv() => {
                let Some(state) = maybe_state else {
                    warn!("Route watcher stream ended");
                    break;
                };

                info!(
                    route = state.route.label(),
                    device = state.device.as_ref().map(|d| d.display_name.as_str()),
                    "Route changed"
                );

                let _ = event_tx.send(Event {
                    event: EventType::RouteChanged,
                    data: serde_json::to_value(RoutePayload::from(&state)).unwrap_or_default(),
                });
            }

            // IPC requests
            Some((client_id, request, response_tx)) = request_rx.recv() => {
                debug!(client_id, request_id = request.id, "Handling IPC request");

                let shutdown = matches!(request.method, auricle_ipc::Method::Shutdown);
                let result = server::handle_request(&request.method, &subscription);
                let _ = response_tx.send(Response { id: request.id, result }).await;

                if shutdown {
                    break;
                }
            }

            // Shutdown signals
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                break;
            }
        }
    }

    // Cleanup
    info!("Shutting down...");
    subscription.stop();
    ipc_handle.abort();

    info!("Auricle daemon stopped");
    Ok(())
}
