//! Device signal normalization.
//!
//! Translates raw, platform-specific signals into the closed set of
//! [`DeviceFact`] values the reconciler consumes. Purely translational:
//! the only side effect is the lazily-invoked attached-devices query used
//! to resolve signals that carry no device metadata. Malformed signals
//! produce no facts; the OS event stream cannot be made to honor a
//! contract, so we fail silent rather than propagate errors.

use tracing::trace;

use crate::device::{DeviceCapabilityClass, DeviceId, DeviceRecord};

/// Platform type codes, mirroring the Android `AudioDeviceInfo` table.
/// Other platforms translate their port types into these before handing
/// signals to the normalizer.
pub mod type_code {
    pub const BUILTIN_EARPIECE: u32 = 1;
    pub const BUILTIN_SPEAKER: u32 = 2;
    pub const WIRED_HEADSET: u32 = 3;
    pub const WIRED_HEADPHONES: u32 = 4;
    pub const BLUETOOTH_SCO: u32 = 7;
    pub const BLUETOOTH_A2DP: u32 = 8;
    pub const USB_DEVICE: u32 = 11;
    pub const USB_HEADSET: u32 = 22;
    pub const HEARING_AID: u32 = 23;
    pub const BLE_HEADSET: u32 = 26;
    pub const BLE_SPEAKER: u32 = 27;
}

/// One attached output device as reported by the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceInfo {
    /// Platform attachment id
    pub id: u32,
    /// Platform type code (see [`type_code`])
    pub type_code: u32,
    /// Product name, when the platform supplies one
    pub product_name: Option<String>,
    /// Transport address (e.g. Bluetooth MAC), when available
    pub address: Option<String>,
    /// Whether the platform flagged this device as the active output
    pub is_active_output: bool,
}

impl RawDeviceInfo {
    /// Bare device info with no optional metadata.
    #[must_use]
    pub fn new(id: u32, type_code: u32) -> Self {
        Self { id, type_code, product_name: None, address: None, is_active_output: false }
    }

    /// Same info with a product name attached.
    #[must_use]
    pub fn named(id: u32, type_code: u32, product_name: impl Into<String>) -> Self {
        Self { product_name: Some(product_name.into()), ..Self::new(id, type_code) }
    }
}

/// Raw platform signal, the union of every event shape the platform
/// layers produce: callback-based enumeration deltas, broadcast-intent
/// plug events, becoming-noisy broadcasts, and route-change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSignal {
    /// Device-added callback fired with the affected devices
    DevicesAdded(Vec<RawDeviceInfo>),
    /// Device-removed callback fired with the affected attachment ids
    DevicesRemoved(Vec<u32>),
    /// Wired plug broadcast. `state` is the raw intent extra: `Some(1)`
    /// plugged, `Some(0)` unplugged, anything else malformed.
    HeadsetPlug { state: Option<i32> },
    /// The OS is about to tear the current route down (e.g. headphones
    /// yanked); no device id is supplied.
    AudioBecomingNoisy,
    /// Notification-style route change with no delta information.
    RouteChanged,
}

/// Abstract device fact consumed by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFact {
    /// A device of some capability class was attached
    Added(DeviceRecord),
    /// The attachment with this id went away
    Removed(DeviceId),
    /// Wired plug state changed without device metadata
    WiredPlugStateChanged(bool),
    /// Imminent route loss; clears wired entries
    BecomingNoisy,
    /// Explicit poll: re-evaluate the route now
    RouteSnapshotRequested,
}

/// Map a platform type code to a capability class.
///
/// Total and stable: unrecognized codes classify as `Unknown` rather than
/// being dropped, so the reconciler can still report that *something* is
/// connected.
#[must_use]
pub fn classify(code: u32) -> DeviceCapabilityClass {
    match code {
        type_code::WIRED_HEADSET
        | type_code::WIRED_HEADPHONES
        | type_code::USB_DEVICE
        | type_code::USB_HEADSET => DeviceCapabilityClass::WiredHeadset,
        type_code::BLUETOOTH_A2DP => DeviceCapabilityClass::BluetoothA2dp,
        type_code::BLUETOOTH_SCO => DeviceCapabilityClass::BluetoothHfp,
        type_code::BLE_HEADSET | type_code::BLE_SPEAKER | type_code::HEARING_AID => {
            DeviceCapabilityClass::BluetoothLe
        }
        type_code::BUILTIN_SPEAKER => DeviceCapabilityClass::BuiltInSpeaker,
        type_code::BUILTIN_EARPIECE => DeviceCapabilityClass::BuiltInReceiver,
        _ => DeviceCapabilityClass::Unknown,
    }
}

/// Build a device record from raw platform info, falling back to a
/// class-appropriate display name when the platform gave none.
#[must_use]
pub fn record_from_raw(raw: &RawDeviceInfo) -> DeviceRecord {
    let capability = classify(raw.type_code);
    let display_name = raw
        .product_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .map_or_else(|| default_display_name(capability).to_string(), String::from);

    DeviceRecord {
        id: DeviceId(raw.id),
        capability,
        display_name,
        is_current_output: raw.is_active_output,
    }
}

fn default_display_name(capability: DeviceCapabilityClass) -> &'static str {
    match capability {
        DeviceCapabilityClass::WiredHeadset => "Wired Headphones",
        DeviceCapabilityClass::BluetoothA2dp => "Bluetooth Headphones",
        DeviceCapabilityClass::BluetoothHfp => "Bluetooth Headset",
        DeviceCapabilityClass::BluetoothLe => "Bluetooth LE Device",
        DeviceCapabilityClass::BuiltInSpeaker => "Speaker",
        DeviceCapabilityClass::BuiltInReceiver => "Receiver",
        DeviceCapabilityClass::Unknown => "Audio Device",
    }
}

/// Translate one raw signal into zero or more device facts.
///
/// `attached` is a synchronous query of all currently attached output
/// devices, invoked only for signals that carry no device metadata of
/// their own (a bare wired-plug intent).
pub fn normalize<F>(signal: &RawSignal, attached: F) -> Vec<DeviceFact>
where
    F: FnOnce() -> Vec<RawDeviceInfo>,
{
    match signal {
        RawSignal::DevicesAdded(devices) => {
            devices.iter().map(|raw| DeviceFact::Added(record_from_raw(raw))).collect()
        }
        RawSignal::DevicesRemoved(ids) => {
            ids.iter().map(|id| DeviceFact::Removed(DeviceId(*id))).collect()
        }
        RawSignal::HeadsetPlug { state: Some(1) } => {
            // The intent names no device; resolve through the device query.
            let wired: Vec<DeviceFact> = attached()
                .iter()
                .filter(|raw| classify(raw.type_code).is_wired())
                .map(|raw| DeviceFact::Added(record_from_raw(raw)))
                .collect();

            if wired.is_empty() {
                // Query raced the enumeration; let the reconciler register
                // a fallback wired entry.
                vec![DeviceFact::WiredPlugStateChanged(true)]
            } else {
                wired
            }
        }
        RawSignal::HeadsetPlug { state: Some(0) } => {
            vec![DeviceFact::WiredPlugStateChanged(false)]
        }
        RawSignal::HeadsetPlug { state } => {
            trace!(?state, "dropping malformed headset plug intent");
            Vec::new()
        }
        RawSignal::AudioBecomingNoisy => vec![DeviceFact::BecomingNoisy],
        RawSignal::RouteChanged => vec![DeviceFact::RouteSnapshotRequested],
    }
}
