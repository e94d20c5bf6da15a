//! Route reconciliation state machine.
//!
//! The reconciler owns the set of currently-known output devices, derives
//! the single authoritative route from it, and suppresses duplicate
//! notifications. It is synchronous and never fails: every input is a
//! well-formed [`DeviceFact`] by construction, and callers serialize all
//! mutation (single-writer, per the subscription model).

use std::collections::HashMap;

use tracing::debug;

use crate::device::{DeviceId, DeviceRecord};
use crate::normalize::DeviceFact;
use crate::route::{RoutePolicy, RouteState};

struct Entry {
    record: DeviceRecord,
    /// Insertion sequence; ties within a capability class go to the
    /// most-recently-added device.
    seq: u64,
}

/// Stateful classifier deriving one authoritative route from device facts.
pub struct Reconciler {
    policy: RoutePolicy,
    devices: HashMap<DeviceId, Entry>,
    next_seq: u64,
    last_delivered: Option<RouteState>,
}

impl Reconciler {
    /// Fresh reconciler with an empty device set.
    #[must_use]
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy, devices: HashMap::new(), next_seq: 0, last_delivered: None }
    }

    /// Seed the device set from a subscribe-time snapshot and return the
    /// resulting state. The result is recorded as delivered: the first
    /// emission is never suppressed, so callers forward it unconditionally.
    pub fn prime(&mut self, records: impl IntoIterator<Item = DeviceRecord>) -> RouteState {
        self.devices.clear();
        for record in records {
            self.insert(record);
        }
        let state = self.snapshot();
        self.last_delivered = Some(state.clone());
        state
    }

    /// Apply one fact, returning the new state when it changes the
    /// externally visible route (kind or device identity), `None` when the
    /// notification would be a duplicate or no-op.
    pub fn apply(&mut self, fact: DeviceFact) -> Option<RouteState> {
        match fact {
            DeviceFact::Added(record) => self.insert(record),
            DeviceFact::Removed(id) => {
                self.devices.remove(&id);
            }
            // The OS cannot name the unplugged device, so every
            // wired-class entry goes.
            DeviceFact::WiredPlugStateChanged(false) | DeviceFact::BecomingNoisy => {
                self.devices.retain(|_, entry| !entry.record.capability.is_wired());
            }
            DeviceFact::WiredPlugStateChanged(true) => {
                if !self.devices.values().any(|entry| entry.record.capability.is_wired()) {
                    self.insert(DeviceRecord::fallback_wired());
                }
            }
            DeviceFact::RouteSnapshotRequested => {}
        }
        self.emit_if_changed()
    }

    /// Replace the device set wholesale, for platforms whose route-change
    /// notifications carry no delta information. Same suppression rule as
    /// [`apply`](Self::apply).
    pub fn resync(&mut self, records: impl IntoIterator<Item = DeviceRecord>) -> Option<RouteState> {
        self.devices.clear();
        for record in records {
            self.insert(record);
        }
        self.emit_if_changed()
    }

    /// Pure query: recompute the route from the current device set without
    /// mutating anything.
    #[must_use]
    pub fn snapshot(&self) -> RouteState {
        self.devices
            .values()
            .max_by_key(|entry| (self.policy.rank(entry.record.capability), entry.seq))
            .map(|entry| RouteState::for_device(entry.record.clone()))
            .unwrap_or_else(RouteState::none)
    }

    /// The devices currently known to the reconciler.
    #[must_use]
    pub fn known_devices(&self) -> Vec<DeviceRecord> {
        let mut entries: Vec<&Entry> = self.devices.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.record.clone()).collect()
    }

    /// The last state handed to the subscriber, if any.
    #[must_use]
    pub fn last_delivered(&self) -> Option<&RouteState> {
        self.last_delivered.as_ref()
    }

    fn insert(&mut self, record: DeviceRecord) {
        self.next_seq += 1;
        self.devices.insert(record.id, Entry { record, seq: self.next_seq });
    }

    fn emit_if_changed(&mut self) -> Option<RouteState> {
        let candidate = self.snapshot();
        let changed =
            self.last_delivered.as_ref().is_none_or(|prev| !prev.same_output(&candidate));
        if changed {
            debug!(route = candidate.route.label(), "route transition");
            self.last_delivered = Some(candidate.clone());
            Some(candidate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::device::DeviceCapabilityClass;
    use crate::route::RouteKind;

    fn device(id: u32, capability: DeviceCapabilityClass) -> DeviceRecord {
        DeviceRecord::new(DeviceId(id), capability, format!("dev-{id}"))
    }

    fn primed(records: Vec<DeviceRecord>) -> Reconciler {
        let mut reconciler = Reconciler::new(RoutePolicy::default());
        reconciler.prime(records);
        reconciler
    }

    #[test]
    fn empty_set_reports_none() {
        let mut reconciler = Reconciler::new(RoutePolicy::default());
        let state = reconciler.prime(Vec::new());
        assert_eq!(state, RouteState::none());
    }

    #[test]
    fn duplicate_added_yields_one_emission() {
        let mut reconciler = primed(Vec::new());
        let d = device(1, DeviceCapabilityClass::BluetoothA2dp);

        assert!(reconciler.apply(DeviceFact::Added(d.clone())).is_some());
        assert!(reconciler.apply(DeviceFact::Added(d)).is_none());
    }

    #[test]
    fn wired_overrides_idle_bluetooth_and_reverts() {
        let mut reconciler = primed(vec![device(1, DeviceCapabilityClass::BluetoothA2dp)]);
        assert_eq!(reconciler.snapshot().route, RouteKind::BluetoothA2dp);

        let state = reconciler
            .apply(DeviceFact::Added(device(2, DeviceCapabilityClass::WiredHeadset)))
            .expect("wired attach must transition");
        assert_eq!(state.route, RouteKind::Wired);

        let state = reconciler
            .apply(DeviceFact::Removed(DeviceId(2)))
            .expect("wired detach must transition back");
        assert_eq!(state.route, RouteKind::BluetoothA2dp);
    }

    #[test]
    fn bluetooth_first_policy_keeps_bluetooth_on_top() {
        let mut reconciler = Reconciler::new(RoutePolicy { wired_overrides_bluetooth: false });
        reconciler.prime(vec![device(1, DeviceCapabilityClass::BluetoothA2dp)]);

        assert!(
            reconciler
                .apply(DeviceFact::Added(device(2, DeviceCapabilityClass::WiredHeadset)))
                .is_none()
        );
        assert_eq!(reconciler.snapshot().route, RouteKind::BluetoothA2dp);
    }

    #[test]
    fn becoming_noisy_clears_wired_only() {
        let mut reconciler = primed(vec![
            device(1, DeviceCapabilityClass::WiredHeadset),
            device(2, DeviceCapabilityClass::BluetoothA2dp),
        ]);
        assert_eq!(reconciler.snapshot().route, RouteKind::Wired);

        let state = reconciler.apply(DeviceFact::BecomingNoisy).expect("route must change");
        assert_eq!(state.route, RouteKind::BluetoothA2dp);
        assert_eq!(reconciler.known_devices().len(), 1);
    }

    #[test]
    fn unplug_without_wired_present_is_a_noop() {
        let mut reconciler = primed(vec![device(1, DeviceCapabilityClass::BluetoothHfp)]);
        assert!(reconciler.apply(DeviceFact::WiredPlugStateChanged(false)).is_none());
        assert_eq!(reconciler.snapshot().route, RouteKind::BluetoothHfp);
    }

    #[test]
    fn plug_without_metadata_registers_fallback_once() {
        let mut reconciler = primed(Vec::new());

        let state = reconciler
            .apply(DeviceFact::WiredPlugStateChanged(true))
            .expect("plug must transition");
        assert_eq!(state.route, RouteKind::Wired);
        assert_eq!(state.device.map(|d| d.id), Some(DeviceId::FALLBACK_WIRED));

        // A second bare plug signal changes nothing
        assert!(reconciler.apply(DeviceFact::WiredPlugStateChanged(true)).is_none());
        assert_eq!(reconciler.known_devices().len(), 1);
    }

    #[test]
    fn plug_with_real_wired_present_adds_no_fallback() {
        let mut reconciler = primed(vec![device(3, DeviceCapabilityClass::WiredHeadset)]);
        assert!(reconciler.apply(DeviceFact::WiredPlugStateChanged(true)).is_none());
        assert_eq!(reconciler.known_devices(), vec![device(3, DeviceCapabilityClass::WiredHeadset)]);
    }

    #[test]
    fn same_class_switch_emits_for_new_device() {
        let mut reconciler = primed(vec![device(1, DeviceCapabilityClass::BluetoothA2dp)]);

        let state = reconciler
            .apply(DeviceFact::Added(device(2, DeviceCapabilityClass::BluetoothA2dp)))
            .expect("device identity changed");
        assert_eq!(state.route, RouteKind::BluetoothA2dp);
        assert_eq!(state.device.map(|d| d.id), Some(DeviceId(2)));
    }

    #[test]
    fn snapshot_request_recomputes_without_mutation() {
        let mut reconciler = primed(vec![device(1, DeviceCapabilityClass::WiredHeadset)]);

        assert!(reconciler.apply(DeviceFact::RouteSnapshotRequested).is_none());
        assert_eq!(reconciler.known_devices().len(), 1);
    }

    #[test]
    fn resync_replaces_set_and_suppresses_equal_route() {
        let mut reconciler = primed(vec![device(1, DeviceCapabilityClass::BluetoothA2dp)]);

        // Same winning device survives the resync: no emission
        assert!(
            reconciler
                .resync(vec![
                    device(1, DeviceCapabilityClass::BluetoothA2dp),
                    device(9, DeviceCapabilityClass::BuiltInSpeaker),
                ])
                .is_none()
        );

        // Winning device gone: emission reflecting what remains
        let state = reconciler
            .resync(vec![device(9, DeviceCapabilityClass::BuiltInSpeaker)])
            .expect("route must change");
        assert_eq!(state.route, RouteKind::Speaker);
    }

    #[test]
    fn receiver_only_set_reports_receiver() {
        let reconciler = primed(vec![device(1, DeviceCapabilityClass::BuiltInReceiver)]);
        assert_eq!(reconciler.snapshot().route, RouteKind::Receiver);
    }

    #[test]
    fn unknown_device_still_reports_connected() {
        let mut reconciler = primed(vec![device(1, DeviceCapabilityClass::BuiltInSpeaker)]);

        let state = reconciler
            .apply(DeviceFact::Added(device(2, DeviceCapabilityClass::Unknown)))
            .expect("unknown outranks speaker");
        assert_eq!(state.route, RouteKind::Unknown);
    }

    fn arb_capability() -> impl Strategy<Value = DeviceCapabilityClass> {
        prop_oneof![
            Just(DeviceCapabilityClass::WiredHeadset),
            Just(DeviceCapabilityClass::BluetoothA2dp),
            Just(DeviceCapabilityClass::BluetoothHfp),
            Just(DeviceCapabilityClass::BluetoothLe),
            Just(DeviceCapabilityClass::BuiltInSpeaker),
            Just(DeviceCapabilityClass::BuiltInReceiver),
            Just(DeviceCapabilityClass::Unknown),
        ]
    }

    proptest! {
        /// The route always equals the highest-priority class present,
        /// regardless of insertion order.
        #[test]
        fn priority_invariant_over_insertion_order(
            capabilities in proptest::collection::vec(arb_capability(), 1..8)
        ) {
            let policy = RoutePolicy::default();
            let mut reconciler = Reconciler::new(policy);
            reconciler.prime(
                capabilities
                    .iter()
                    .enumerate()
                    .map(|(i, &capability)| device(u32::try_from(i).unwrap(), capability)),
            );

            let best = capabilities
                .iter()
                .map(|&capability| policy.rank(capability))
                .max()
                .unwrap();
            let state = reconciler.snapshot();
            let winner = state.device.expect("non-empty set must name a device");

            prop_assert_eq!(policy.rank(winner.capability), best);
            prop_assert_eq!(state.route, RouteKind::from(winner.capability));
        }

        /// Within the winning class, the most recently added device carries
        /// the route.
        #[test]
        fn most_recent_wins_class_ties(count in 2u32..6) {
            let mut reconciler = Reconciler::new(RoutePolicy::default());
            reconciler.prime(
                (0..count).map(|i| device(i, DeviceCapabilityClass::BluetoothA2dp)),
            );

            let winner = reconciler.snapshot().device.unwrap();
            prop_assert_eq!(winner.id, DeviceId(count - 1));
        }
    }
}
