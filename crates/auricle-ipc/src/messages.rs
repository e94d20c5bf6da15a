//! IPC message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request envelope sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID for matching responses
    pub id: u64,
    /// The method to invoke
    pub method: Method,
}

/// Response envelope sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this is responding to
    pub id: u64,
    /// Result of the request
    pub result: Result<Value, ErrorInfo>,
}

/// Error information in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Methods that can be invoked via IPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    // State queries
    /// Get the current audio route
    GetRoute,
    /// Get the devices currently known to the reconciler
    GetDevices,

    // Subscriptions
    /// Subscribe to event types (empty list = all events)
    Subscribe { events: Vec<String> },
    /// Unsubscribe from event types
    Unsubscribe { events: Vec<String> },

    // System
    /// Request graceful shutdown
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let request = Request { id: 7, method: Method::GetRoute };
        let json = serde_json::to_string(&request).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, 7);
        assert!(matches!(parsed.method, Method::GetRoute));
    }

    #[test]
    fn method_params_round_trip() {
        let json = serde_json::to_string(&Method::Subscribe {
            events: vec!["route_changed".to_string()],
        })
        .unwrap();
        let parsed: Method = serde_json::from_str(&json).unwrap();

        assert!(matches!(parsed, Method::Subscribe { events } if events == ["route_changed"]));
    }

    #[test]
    fn error_response_round_trips() {
        let response =
            Response { id: 1, result: Err(ErrorInfo::new(400, "no such method")) };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert!(matches!(parsed.result, Err(info) if info.code == 400));
    }
}
