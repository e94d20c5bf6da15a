//! Auricle Core - Route classification, signal normalization, and reconciliation.
//!
//! This crate contains the platform-agnostic domain logic: it turns raw
//! platform signals into device facts and derives a single authoritative
//! audio route from the set of known output devices. It has no async
//! runtime dependency; the subscription plumbing lives in `auricle-host`.

pub mod device;
pub mod normalize;
pub mod reconcile;
pub mod route;

pub use device::{DeviceCapabilityClass, DeviceId, DeviceRecord};
pub use normalize::{DeviceFact, RawDeviceInfo, RawSignal, classify, normalize, record_from_raw};
pub use reconcile::Reconciler;
pub use route::{RouteKind, RoutePolicy, RouteState};
