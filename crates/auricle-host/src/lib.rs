//! Auricle Host - Platform boundary and route subscription runtime.
//!
//! This crate owns everything between the platform's audio APIs and the
//! reconciliation core: the [`AudioHost`] trait that platform integrations
//! implement, a scriptable in-process host for tests and demos, and the
//! [`RouteWatcher`] runtime that drives raw signals through the core and
//! delivers route transitions to subscribers.

pub mod error;
pub mod host;
pub mod mock;
pub mod watcher;

pub use error::{HostError, HostResult};
pub use host::{AudioHost, NullHost};
pub use mock::MockHost;
pub use watcher::{RouteSubscription, RouteWatcher, WatcherConfig, query_current_route};
