//! Platform host boundary.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use auricle_core::{RawDeviceInfo, RawSignal};

use crate::error::HostResult;

/// Capacity of the raw signal channel handed to subscribers.
pub(crate) const SIGNAL_CHANNEL_CAPACITY: usize = 256;

/// Interface to a platform's audio device APIs.
///
/// Implementations are thin: they enumerate attached output devices and
/// forward the platform's hardware-change callbacks as [`RawSignal`]
/// values. All classification and reconciliation happens downstream in
/// `auricle-core`.
pub trait AudioHost: Send + Sync + 'static {
    /// Synchronously query all currently attached output devices.
    ///
    /// An absent or not-yet-ready platform audio service is reported as an
    /// empty set; the route then classifies as `none`.
    fn attached_output_devices(&self) -> Vec<RawDeviceInfo>;

    /// Begin pushing raw signals. Delivery stops when the returned
    /// receiver is dropped.
    ///
    /// # Errors
    /// Returns an error if the platform refuses the callback/broadcast
    /// registration.
    fn subscribe(&self) -> HostResult<mpsc::Receiver<RawSignal>>;
}

/// Host for environments with no platform integration: reports nothing
/// attached and never signals.
#[derive(Default)]
pub struct NullHost {
    subscribers: Mutex<Vec<mpsc::Sender<RawSignal>>>,
}

impl NullHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioHost for NullHost {
    fn attached_output_devices(&self) -> Vec<RawDeviceInfo> {
        Vec::new()
    }

    fn subscribe(&self) -> HostResult<mpsc::Receiver<RawSignal>> {
        let (tx, rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        // Park the sender so the stream stays open; it just never fires.
        self.subscribers.lock().push(tx);
        Ok(rx)
    }
}
