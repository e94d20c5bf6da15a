//! Scriptable in-process host for tests and demos.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use auricle_core::{RawDeviceInfo, RawSignal};

use crate::error::HostResult;
use crate::host::{AudioHost, SIGNAL_CHANNEL_CAPACITY};

/// Host whose attached-device set and signal stream are driven by the
/// caller. Stands in for a real platform integration in tests and demos.
#[derive(Default)]
pub struct MockHost {
    attached: Mutex<Vec<RawDeviceInfo>>,
    subscribers: Mutex<Vec<mpsc::Sender<RawSignal>>>,
}

impl MockHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that already reports the given devices as attached.
    #[must_use]
    pub fn with_attached(devices: Vec<RawDeviceInfo>) -> Self {
        Self { attached: Mutex::new(devices), subscribers: Mutex::new(Vec::new()) }
    }

    /// Replace the attached-device set without signaling anyone.
    pub fn set_attached(&self, devices: Vec<RawDeviceInfo>) {
        *self.attached.lock() = devices;
    }

    /// Push a raw signal to every live subscriber.
    pub fn emit(&self, signal: RawSignal) {
        self.subscribers.lock().retain(|tx| {
            !matches!(tx.try_send(signal.clone()), Err(TrySendError::Closed(_)))
        });
    }

    /// Attach a device: updates the queryable set and fires the
    /// device-added callback, replacing any prior attachment with the
    /// same id.
    pub fn attach(&self, device: RawDeviceInfo) {
        {
            let mut attached = self.attached.lock();
            attached.retain(|d| d.id != device.id);
            attached.push(device.clone());
        }
        self.emit(RawSignal::DevicesAdded(vec![device]));
    }

    /// Detach a device by id and fire the device-removed callback.
    pub fn detach(&self, id: u32) {
        self.attached.lock().retain(|d| d.id != id);
        self.emit(RawSignal::DevicesRemoved(vec![id]));
    }
}

impl AudioHost for MockHost {
    fn attached_output_devices(&self) -> Vec<RawDeviceInfo> {
        self.attached.lock().clone()
    }

    fn subscribe(&self) -> HostResult<mpsc::Receiver<RawSignal>> {
        let (tx, rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        self.subscribers.lock().push(tx);
        Ok(rx)
    }
}
