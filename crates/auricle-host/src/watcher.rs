//! Route subscription runtime.
//!
//! [`RouteWatcher::start`] primes a fresh reconciler from the host's
//! attached-device snapshot, delivers that initial state unconditionally,
//! then drives the host's raw-signal stream through the normalizer and
//! reconciler on a background task. Transitions pass through a single
//! cancellable, resettable debounce window before reaching the
//! subscriber, so bursts of unstable callbacks around reconnection events
//! collapse into the settled end state.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Sleep};
use tracing::{debug, trace};

use auricle_core::{
    DeviceFact, DeviceRecord, RawSignal, Reconciler, RoutePolicy, RouteState, normalize,
    record_from_raw,
};

use crate::error::HostResult;
use crate::host::AudioHost;

/// Capacity of the route-state channel handed to the subscriber.
const ROUTE_CHANNEL_CAPACITY: usize = 64;

/// Debounce window observed to settle platform callback bursts.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Tuning for a route subscription.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Precedence policy for simultaneously-connected classes
    pub policy: RoutePolicy,
    /// Debounce window; zero delivers every transition immediately
    pub debounce_window: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { policy: RoutePolicy::default(), debounce_window: DEFAULT_DEBOUNCE_WINDOW }
    }
}

struct Inner {
    reconciler: Mutex<Reconciler>,
    /// Latest state actually handed to the subscriber
    delivered: ArcSwap<RouteState>,
    stopped: AtomicBool,
}

/// Handle to a running route subscription.
pub struct RouteSubscription {
    inner: Arc<Inner>,
    task: JoinHandle<()>,
}

impl RouteSubscription {
    /// Stop listening: cancels the signal task and any pending debounce
    /// window. Idempotent; nothing is emitted after the first call.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            self.task.abort();
            debug!("route subscription stopped");
        }
    }

    /// Latest state delivered to the subscriber, lock-free.
    #[must_use]
    pub fn current(&self) -> RouteState {
        self.inner.delivered.load_full().as_ref().clone()
    }

    /// Devices currently known to the reconciler, in attachment order.
    #[must_use]
    pub fn known_devices(&self) -> Vec<DeviceRecord> {
        self.inner.reconciler.lock().known_devices()
    }
}

impl Drop for RouteSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Entry point for route subscriptions.
pub struct RouteWatcher;

impl RouteWatcher {
    /// Begin listening on `host`.
    ///
    /// The initial snapshot is queued on the returned channel before this
    /// function returns, so the first received value is always the
    /// subscribe-time state, even when it equals `none`.
    ///
    /// # Errors
    /// Returns an error if the host refuses the signal subscription.
    pub fn start(
        host: Arc<dyn AudioHost>,
        config: WatcherConfig,
    ) -> HostResult<(RouteSubscription, mpsc::Receiver<RouteState>)> {
        let signals = host.subscribe()?;
        let (route_tx, route_rx) = mpsc::channel(ROUTE_CHANNEL_CAPACITY);

        let mut reconciler = Reconciler::new(config.policy);
        let initial = reconciler.prime(attached_records(host.as_ref()));
        debug!(route = initial.route.label(), "route subscription started");

        let inner = Arc::new(Inner {
            reconciler: Mutex::new(reconciler),
            delivered: ArcSwap::from_pointee(initial.clone()),
            stopped: AtomicBool::new(false),
        });

        // Fresh channel, receiver still in scope: the send cannot fail, and
        // the initial snapshot is guaranteed to arrive first.
        let _ = route_tx.try_send(initial);

        let task = tokio::spawn(drive(
            host,
            signals,
            Arc::clone(&inner),
            route_tx,
            config.debounce_window,
        ));

        Ok((RouteSubscription { inner, task }, route_rx))
    }
}

/// One-shot route query without a subscription.
#[must_use]
pub fn query_current_route(host: &dyn AudioHost, policy: RoutePolicy) -> RouteState {
    Reconciler::new(policy).prime(attached_records(host))
}

fn attached_records(host: &dyn AudioHost) -> Vec<DeviceRecord> {
    host.attached_output_devices().iter().map(record_from_raw).collect()
}

async fn drive(
    host: Arc<dyn AudioHost>,
    mut signals: mpsc::Receiver<RawSignal>,
    inner: Arc<Inner>,
    route_tx: mpsc::Sender<RouteState>,
    window: Duration,
) {
    // The single debounce timer. Re-armed (never stacked) whenever a fact
    // arrives while a window is open.
    let mut pending: Option<Pin<Box<Sleep>>> = None;

    loop {
        tokio::select! {
            maybe_signal = signals.recv() => {
                let Some(signal) = maybe_signal else {
                    // Host stream ended. Report anything still pending,
                    // then wind down.
                    if pending.take().is_some() {
                        let settled = inner.reconciler.lock().snapshot();
                        let _ = deliver_if_changed(&inner, &route_tx, settled).await;
                    }
                    debug!("host signal stream closed");
                    break;
                };
                trace!(?signal, "raw signal");

                let facts = normalize(&signal, || host.attached_output_devices());
                for fact in facts {
                    let transition = match fact {
                        // Notification-style platforms give no deltas;
                        // rebuild the set from a fresh query.
                        DeviceFact::RouteSnapshotRequested => {
                            let records = attached_records(host.as_ref());
                            inner.reconciler.lock().resync(records)
                        }
                        fact => inner.reconciler.lock().apply(fact),
                    };

                    if window.is_zero() {
                        if let Some(state) = transition {
                            if !deliver_if_changed(&inner, &route_tx, state).await {
                                return;
                            }
                        }
                    } else if transition.is_some() || pending.is_some() {
                        pending = Some(Box::pin(time::sleep(window)));
                    }
                }
            }

            () = async {
                match pending.as_mut() {
                    Some(sleep) => sleep.await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                pending = None;
                let settled = inner.reconciler.lock().snapshot();
                if !deliver_if_changed(&inner, &route_tx, settled).await {
                    break;
                }
            }
        }
    }
}

/// Hand `state` to the subscriber unless it matches what they already
/// have. Returns `false` when the subscriber is gone.
async fn deliver_if_changed(
    inner: &Inner,
    route_tx: &mpsc::Sender<RouteState>,
    state: RouteState,
) -> bool {
    if state.same_output(&inner.delivered.load()) {
        return true;
    }
    debug!(route = state.route.label(), "route changed");
    inner.delivered.store(Arc::new(state.clone()));
    route_tx.send(state).await.is_ok()
}
