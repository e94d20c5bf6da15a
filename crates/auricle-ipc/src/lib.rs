//! Auricle IPC - Unix socket protocol and client library.
//!
//! This crate defines the communication protocol between the daemon and
//! its clients (newline-delimited JSON over a Unix socket), as well as a
//! client library for connecting to the daemon.

pub mod client;
pub mod error;
pub mod events;
pub mod messages;
pub mod server;

pub use client::IpcClient;
pub use error::{IpcError, IpcResult};
pub use events::{DevicePayload, Event, EventType, RoutePayload};
pub use messages::{ErrorInfo, Method, Request, Response};
pub use server::IpcServer;

use std::path::PathBuf;

/// Get the default socket path.
///
/// Uses `$XDG_RUNTIME_DIR/auricle/daemon.sock` or falls back to
/// `/run/user/$UID/auricle/daemon.sock`.
#[must_use]
#[allow(unsafe_code)] // libc::getuid() is safe to call
pub fn socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("auricle/daemon.sock")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/run/user/{uid}/auricle/daemon.sock"))
    }
}
