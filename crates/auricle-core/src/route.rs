//! Route kinds, route state, and the priority policy.

use serde::{Deserialize, Serialize};

use crate::device::{DeviceCapabilityClass, DeviceRecord};

/// The audio output path currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// No output device known
    None,
    /// Wired headset/headphones
    Wired,
    /// Bluetooth A2DP (stereo media)
    BluetoothA2dp,
    /// Bluetooth HFP/SCO (telephony)
    BluetoothHfp,
    /// Bluetooth LE audio
    BluetoothLe,
    /// Built-in loudspeaker
    Speaker,
    /// Built-in earpiece
    Receiver,
    /// Connected, but unrecognized device type
    Unknown,
}

impl RouteKind {
    /// Stable label used on the wire and in logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Wired => "wired",
            Self::BluetoothA2dp => "bluetooth_a2dp",
            Self::BluetoothHfp => "bluetooth_hfp",
            Self::BluetoothLe => "bluetooth_le",
            Self::Speaker => "speaker",
            Self::Receiver => "receiver",
            Self::Unknown => "unknown",
        }
    }
}

impl From<DeviceCapabilityClass> for RouteKind {
    fn from(capability: DeviceCapabilityClass) -> Self {
        match capability {
            DeviceCapabilityClass::WiredHeadset => Self::Wired,
            DeviceCapabilityClass::BluetoothA2dp => Self::BluetoothA2dp,
            DeviceCapabilityClass::BluetoothHfp => Self::BluetoothHfp,
            DeviceCapabilityClass::BluetoothLe => Self::BluetoothLe,
            DeviceCapabilityClass::BuiltInSpeaker => Self::Speaker,
            DeviceCapabilityClass::BuiltInReceiver => Self::Receiver,
            DeviceCapabilityClass::Unknown => Self::Unknown,
        }
    }
}

/// The reconciler's externally visible result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteState {
    /// Classified route
    pub route: RouteKind,
    /// The device carrying the route, absent for `RouteKind::None`
    pub device: Option<DeviceRecord>,
}

impl RouteState {
    /// State reported when no output device is known.
    #[must_use]
    pub fn none() -> Self {
        Self { route: RouteKind::None, device: None }
    }

    /// State for a winning device record.
    #[must_use]
    pub fn for_device(device: DeviceRecord) -> Self {
        Self { route: device.capability.into(), device: Some(device) }
    }

    /// Whether two states describe the same output: same route kind and
    /// same device attachment. Switching between two headsets of the same
    /// class is a different output even though the kind is unchanged.
    #[must_use]
    pub fn same_output(&self, other: &Self) -> bool {
        self.route == other.route
            && self.device.as_ref().map(|d| d.id) == other.device.as_ref().map(|d| d.id)
    }
}

/// Precedence policy for simultaneously-connected device classes.
///
/// Whether wired hardware outranks a connected Bluetooth profile differs
/// between platforms, so it is a policy choice rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    /// Wired headsets win over Bluetooth profiles when both are attached
    pub wired_overrides_bluetooth: bool,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self { wired_overrides_bluetooth: true }
    }
}

impl RoutePolicy {
    /// Rank of a capability class under this policy; higher wins.
    ///
    /// Bluetooth sub-modes always order A2DP > HFP > LE: prefer the
    /// profile that actually carries audio over a merely-paired LE link.
    #[must_use]
    pub fn rank(&self, capability: DeviceCapabilityClass) -> u8 {
        match capability {
            DeviceCapabilityClass::WiredHeadset => {
                if self.wired_overrides_bluetooth { 7 } else { 4 }
            }
            DeviceCapabilityClass::BluetoothA2dp => {
                if self.wired_overrides_bluetooth { 6 } else { 7 }
            }
            DeviceCapabilityClass::BluetoothHfp => {
                if self.wired_overrides_bluetooth { 5 } else { 6 }
            }
            DeviceCapabilityClass::BluetoothLe => {
                if self.wired_overrides_bluetooth { 4 } else { 5 }
            }
            DeviceCapabilityClass::Unknown => 3,
            DeviceCapabilityClass::BuiltInSpeaker => 2,
            DeviceCapabilityClass::BuiltInReceiver => 1,
        }
    }
}
