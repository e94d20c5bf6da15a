//! Audio output device identity and classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque platform-scoped identifier for one device attachment.
///
/// Unique per attachment instance: the same physical headset can come back
/// under a different id after re-enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// Reserved id for the synthetic wired record registered when a plug
    /// signal carries no device metadata. Platform ids stay well below this.
    pub const FALLBACK_WIRED: DeviceId = DeviceId(u32::MAX);
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Abstract category of an audio output device, independent of the
/// platform-specific type codes it was enumerated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCapabilityClass {
    /// Analog or USB wired headset/headphones
    WiredHeadset,
    /// Bluetooth A2DP profile (stereo media)
    BluetoothA2dp,
    /// Bluetooth HFP/SCO profile (telephony audio)
    BluetoothHfp,
    /// Bluetooth LE audio device (including hearing aids)
    BluetoothLe,
    /// Built-in loudspeaker
    BuiltInSpeaker,
    /// Built-in earpiece/receiver
    BuiltInReceiver,
    /// Anything the platform reported that we do not recognize
    Unknown,
}

impl DeviceCapabilityClass {
    /// Wired-class entries are the ones cleared by an id-less unplug or
    /// becoming-noisy signal.
    #[must_use]
    pub fn is_wired(self) -> bool {
        matches!(self, Self::WiredHeadset)
    }

    /// Any of the Bluetooth profiles.
    #[must_use]
    pub fn is_bluetooth(self) -> bool {
        matches!(self, Self::BluetoothA2dp | Self::BluetoothHfp | Self::BluetoothLe)
    }

    /// Stable label used on the wire and in logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::WiredHeadset => "wired",
            Self::BluetoothA2dp => "bluetooth_a2dp",
            Self::BluetoothHfp => "bluetooth_hfp",
            Self::BluetoothLe => "bluetooth_le",
            Self::BuiltInSpeaker => "speaker",
            Self::BuiltInReceiver => "receiver",
            Self::Unknown => "unknown",
        }
    }
}

/// One currently-known attached output device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Platform-scoped attachment id
    pub id: DeviceId,
    /// Capability classification
    pub capability: DeviceCapabilityClass,
    /// Human-readable product name
    pub display_name: String,
    /// Whether the platform flagged this device as the active output
    pub is_current_output: bool,
}

impl DeviceRecord {
    /// Create a record that is not flagged as the active output.
    #[must_use]
    pub fn new(
        id: DeviceId,
        capability: DeviceCapabilityClass,
        display_name: impl Into<String>,
    ) -> Self {
        Self { id, capability, display_name: display_name.into(), is_current_output: false }
    }

    /// Synthetic wired entry used when an unplug-less platform gives us a
    /// bare "plugged" signal with no device metadata.
    #[must_use]
    pub fn fallback_wired() -> Self {
        Self::new(DeviceId::FALLBACK_WIRED, DeviceCapabilityClass::WiredHeadset, "Wired Headphones")
    }
}
