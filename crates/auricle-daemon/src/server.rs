//! Request handling for the IPC server.

use serde_json::{Value, json};
use tracing::info;

use auricle_host::RouteSubscription;
use auricle_ipc::events::{DevicePayload, RoutePayload};
use auricle_ipc::messages::{ErrorInfo, Method};

/// Handle an IPC request against the live subscription and return a
/// response value.
pub fn handle_request(
    method: &Method,
    subscription: &RouteSubscription,
) -> Result<Value, ErrorInfo> {
    match method {
        Method::GetRoute => {
            let payload = RoutePayload::from(&subscription.current());
            Ok(serde_json::to_value(payload).unwrap_or(json!({})))
        }

        Method::GetDevices => {
            let devices: Vec<DevicePayload> =
                subscription.known_devices().iter().map(DevicePayload::from).collect();
            Ok(serde_json::to_value(devices).unwrap_or(json!([])))
        }

        // Subscription bookkeeping happens in the connection handler;
        // answering here keeps a forwarded request from failing.
        Method::Subscribe { .. } | Method::Unsubscribe { .. } => Ok(json!({ "success": true })),

        Method::Shutdown => {
            info!("Shutdown requested via IPC");
            // The main loop observes the method and breaks
            Ok(json!({ "success": true }))
        }
    }
}
