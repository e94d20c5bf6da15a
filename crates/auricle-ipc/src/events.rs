//! IPC event types (daemon to client) and the route wire format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use auricle_core::{DeviceRecord, RouteState};

/// Event sent from the daemon to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    pub event: EventType,
    /// Event data
    pub data: Value,
}

/// Types of events that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The audio route changed
    RouteChanged,
}

/// Route state as it crosses the process boundary: a string route kind
/// plus an optional device payload. A `none` route carries no device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePayload {
    /// Route kind label
    pub route: String,
    /// Winning device, absent when nothing is connected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DevicePayload>,
}

/// Device description in the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicePayload {
    /// Display name
    pub name: String,
    /// Capability class label
    #[serde(rename = "type")]
    pub kind: String,
    /// Extra platform metadata
    pub metadata: BTreeMap<String, Value>,
}

impl From<&DeviceRecord> for DevicePayload {
    fn from(record: &DeviceRecord) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("deviceId".to_string(), Value::from(record.id.0));
        metadata.insert("isCurrentOutput".to_string(), Value::from(record.is_current_output));

        Self {
            name: record.display_name.clone(),
            kind: record.capability.label().to_string(),
            metadata,
        }
    }
}

impl From<&RouteState> for RoutePayload {
    fn from(state: &RouteState) -> Self {
        Self {
            route: state.route.label().to_string(),
            device: state.device.as_ref().map(DevicePayload::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use auricle_core::{DeviceCapabilityClass, DeviceId};

    use super::*;

    #[test]
    fn none_route_serializes_without_device() {
        let payload = RoutePayload::from(&RouteState::none());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json, serde_json::json!({ "route": "none" }));
    }

    #[test]
    fn device_payload_carries_name_type_and_metadata() {
        let record = DeviceRecord::new(DeviceId(3), DeviceCapabilityClass::BluetoothA2dp, "Buds");
        let payload = RoutePayload::from(&RouteState::for_device(record));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["route"], "bluetooth_a2dp");
        assert_eq!(json["device"]["name"], "Buds");
        assert_eq!(json["device"]["type"], "bluetooth_a2dp");
        assert_eq!(json["device"]["metadata"]["deviceId"], 3);
        assert_eq!(json["device"]["metadata"]["isCurrentOutput"], false);
    }

    #[test]
    fn payload_round_trips() {
        let record =
            DeviceRecord::new(DeviceId(1), DeviceCapabilityClass::WiredHeadset, "AUX");
        let payload = RoutePayload::from(&RouteState::for_device(record));

        let json = serde_json::to_string(&payload).unwrap();
        let parsed: RoutePayload = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.route, "wired");
        assert_eq!(parsed.device.unwrap().name, "AUX");
    }

    #[test]
    fn event_type_uses_snake_case_labels() {
        let json = serde_json::to_string(&EventType::RouteChanged).unwrap();
        assert_eq!(json, "\"route_changed\"");
    }
}
