//! Device registry
//!
//! Owns the device map together with the offline and unknown-sender
//! bookkeeping. Every method is synchronous and takes the current time from
//! the caller, so the manager can hold the registry lock without awaiting.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use higoal_core::{DeviceKey, Frame};
use higoal_types::DeviceRecord;

use crate::device::Device;
use crate::entity::Entity;

/// Devices added and removed by a list refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDiff {
    pub added: Vec<Device>,
    pub removed: Vec<Device>,
}

impl ListDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result of routing one status frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Known device; the entities whose state changed
    Applied(Vec<Entity>),
    /// Sender already marked unknown and the marker has not expired
    Pending,
    /// Sender not recognized; a list refresh should follow
    Unknown,
}

/// Build devices from host-list records, skipping unusable ones
pub fn build_devices(records: &[DeviceRecord]) -> Vec<Device> {
    records
        .iter()
        .filter_map(|record| match Device::from_record(record) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!(device = %record.id, error = %e, "Skipping device record");
                None
            }
        })
        .collect()
}

#[derive(Debug)]
pub struct Registry {
    devices: HashMap<DeviceKey, Device>,
    /// Offline devices and the time they were last polled
    offline: HashMap<DeviceKey, DateTime<Utc>>,
    /// Unrecognized senders and when they were first seen
    unknown: HashMap<DeviceKey, DateTime<Utc>>,
    poll_interval: Duration,
    unknown_retry_interval: Duration,
}

impl Registry {
    pub fn new(poll_interval: Duration, unknown_retry_interval: Duration) -> Self {
        Self {
            devices: HashMap::new(),
            offline: HashMap::new(),
            unknown: HashMap::new(),
            poll_interval,
            unknown_retry_interval,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Replace the whole map; every device starts offline
    pub fn replace(&mut self, devices: Vec<Device>, now: DateTime<Utc>) {
        self.devices.clear();
        self.offline.clear();
        self.unknown.clear();
        for device in devices {
            self.offline.insert(device.key(), now);
            self.devices.insert(device.key(), device);
        }
        info!(count = self.devices.len(), "Loaded devices");
    }

    /// Merge a fresh device list
    ///
    /// Devices already known keep their cached state. New devices start
    /// offline; vanished devices are dropped along with their markers.
    pub fn apply_device_list(&mut self, devices: Vec<Device>, now: DateTime<Utc>) -> ListDiff {
        let fresh: HashSet<DeviceKey> = devices.iter().map(Device::key).collect();

        let gone: Vec<DeviceKey> = self
            .devices
            .keys()
            .filter(|key| !fresh.contains(key))
            .copied()
            .collect();

        let mut diff = ListDiff::default();
        for key in gone {
            self.offline.remove(&key);
            if let Some(device) = self.devices.remove(&key) {
                info!(device = %key, name = device.name(), "Device removed");
                diff.removed.push(device);
            }
        }

        for device in devices {
            let key = device.key();
            self.unknown.remove(&key);
            if self.devices.contains_key(&key) {
                continue;
            }
            info!(device = %key, name = device.name(), "Device added");
            self.offline.insert(key, now);
            diff.added.push(device.clone());
            self.devices.insert(key, device);
        }

        diff.added.sort_by_key(Device::key);
        diff.removed.sort_by_key(Device::key);
        diff
    }

    /// Status requests for offline devices not polled for more than the
    /// poll interval
    ///
    /// The poll time of every returned device is bumped to `now`.
    pub fn take_due_polls(&mut self, now: DateTime<Utc>) -> Vec<Frame> {
        let mut frames = Vec::new();
        for (key, last_poll) in self.offline.iter_mut() {
            if now - *last_poll <= self.poll_interval {
                continue;
            }
            if let Some(device) = self.devices.get(key) {
                debug!(device = %key, "Polling offline device");
                frames.push(device.status_request());
                *last_poll = now;
            }
        }
        frames
    }

    /// Route a status frame to its device
    pub fn apply_status(&mut self, frame: &Frame, now: DateTime<Utc>) -> StatusOutcome {
        let key = frame.identity();

        let retry_interval = self.unknown_retry_interval;
        self.unknown.retain(|_, seen| now - *seen < retry_interval);

        let Some(device) = self.devices.get_mut(&key) else {
            if self.unknown.contains_key(&key) {
                return StatusOutcome::Pending;
            }
            self.unknown.insert(key, now);
            return StatusOutcome::Unknown;
        };

        let changed = device.apply_status(frame);
        if device.is_online() {
            if self.offline.remove(&key).is_some() {
                info!(device = %key, "Device online");
            }
        } else if !self.offline.contains_key(&key) {
            info!(device = %key, "Device offline");
            self.offline.insert(key, now);
        }
        StatusOutcome::Applied(changed)
    }

    pub fn is_unknown_pending(&self, key: &DeviceKey) -> bool {
        self.unknown.contains_key(key)
    }

    pub fn is_offline(&self, key: &DeviceKey) -> bool {
        self.offline.contains_key(key)
    }

    pub fn last_poll(&self, key: &DeviceKey) -> Option<DateTime<Utc>> {
        self.offline.get(key).copied()
    }

    pub fn device(&self, key: &DeviceKey) -> Option<&Device> {
        self.devices.get(key)
    }

    /// All devices, ordered by key
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().cloned().collect();
        devices.sort_by_key(Device::key);
        devices
    }

    /// Status requests for every device, ordered by key
    pub fn status_requests(&self) -> Vec<Frame> {
        let mut keys: Vec<&DeviceKey> = self.devices.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| self.devices.get(key).map(Device::status_request))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use higoal_core::constants::action;
    use pretty_assertions::assert_eq;

    fn device(id: &str) -> Device {
        Device::from_record(&DeviceRecord {
            id: id.to_string(),
            device_type: 5,
            button_name: "Lamp;Fan".to_string(),
            button_type: "1,1".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn status(device: &Device, slot: usize, value: u8) -> Frame {
        let mut frame = device.status_request();
        let bytes = frame.as_mut_bytes();
        bytes[0] = 0xBB;
        bytes[1] = 0x5B;
        bytes[18 + slot] = value;
        frame.seal()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn registry() -> Registry {
        Registry::new(Duration::seconds(30), Duration::seconds(60))
    }

    #[test]
    fn test_build_devices_skips_bad_records() {
        let records = vec![
            DeviceRecord {
                id: "12".into(),
                device_type: 5,
                ..Default::default()
            },
            DeviceRecord {
                id: "1-2".into(),
                device_type: 5,
                ..Default::default()
            },
        ];
        assert_eq!(build_devices(&records).len(), 1);
    }

    #[test]
    fn test_device_list_diff() {
        let (a, b, c) = (device("1"), device("2"), device("3"));
        let mut registry = registry();
        registry.replace(vec![a.clone(), b.clone()], t(0));

        let diff = registry.apply_device_list(vec![b.clone(), c.clone()], t(5));

        assert_eq!(diff.added, vec![c.clone()]);
        assert_eq!(diff.removed, vec![a.clone()]);
        let keys: Vec<DeviceKey> = registry.devices().iter().map(Device::key).collect();
        assert_eq!(keys, vec![b.key(), c.key()]);
        assert!(registry.is_offline(&c.key()));
        assert!(!registry.is_offline(&a.key()));
    }

    #[test]
    fn test_device_list_keeps_cached_state() {
        let a = device("1");
        let mut registry = registry();
        registry.replace(vec![a.clone()], t(0));
        registry.apply_status(&status(&a, 0, action::ON), t(1));

        let diff = registry.apply_device_list(vec![device("1")], t(2));

        assert!(diff.is_empty());
        assert!(registry.device(&a.key()).unwrap().entity(0).unwrap().is_turned_on());
    }

    #[test]
    fn test_offline_poll_once_per_interval() {
        let a = device("1");
        let mut registry = registry();
        registry.replace(vec![a.clone()], t(0));

        assert!(registry.take_due_polls(t(10)).is_empty());

        let frames = registry.take_due_polls(t(31));
        assert_eq!(frames, vec![a.status_request()]);
        assert_eq!(registry.last_poll(&a.key()), Some(t(31)));

        // same tick again
        assert!(registry.take_due_polls(t(31)).is_empty());
        assert!(registry.take_due_polls(t(61)).is_empty());
        assert_eq!(registry.take_due_polls(t(62)).len(), 1);
    }

    #[test]
    fn test_offline_poll_waits_past_interval() {
        let a = device("1");
        let mut registry = registry();
        registry.replace(vec![a.clone()], t(0));

        // exactly one interval is not enough
        assert!(registry.take_due_polls(t(30)).is_empty());
        assert_eq!(registry.last_poll(&a.key()), Some(t(0)));
        assert_eq!(registry.take_due_polls(t(31)), vec![a.status_request()]);
    }

    #[test]
    fn test_status_updates_offline_tracking() {
        let a = device("1");
        let mut registry = registry();
        registry.replace(vec![a.clone()], t(0));

        let outcome = registry.apply_status(&status(&a, 1, action::ON), t(1));
        match outcome {
            StatusOutcome::Applied(changed) => assert_eq!(changed.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!registry.is_offline(&a.key()));

        // all entity states zero
        registry.apply_status(&status(&a, 1, action::OFFLINE), t(2));
        assert_eq!(registry.last_poll(&a.key()), Some(t(2)));

        // still offline, poll time unchanged
        registry.apply_status(&status(&a, 0, action::OFFLINE), t(3));
        assert_eq!(registry.last_poll(&a.key()), Some(t(2)));
    }

    #[test]
    fn test_unknown_sender_is_pending_until_expiry() {
        let stranger = device("42");
        let frame = status(&stranger, 0, action::ON);
        let mut registry = registry();

        assert_eq!(registry.apply_status(&frame, t(0)), StatusOutcome::Unknown);
        assert!(registry.is_unknown_pending(&stranger.key()));
        assert_eq!(registry.apply_status(&frame, t(59)), StatusOutcome::Pending);
        assert_eq!(registry.apply_status(&frame, t(60)), StatusOutcome::Unknown);

        registry.apply_device_list(vec![stranger.clone()], t(61));
        assert!(!registry.is_unknown_pending(&stranger.key()));
        assert!(matches!(
            registry.apply_status(&frame, t(62)),
            StatusOutcome::Applied(ref changed) if changed.len() == 1
        ));
    }

    #[test]
    fn test_expired_unknown_markers_are_pruned() {
        let (known, first, second) = (device("1"), device("42"), device("43"));
        let mut registry = registry();
        registry.replace(vec![known.clone()], t(0));

        registry.apply_status(&status(&first, 0, action::ON), t(0));
        registry.apply_status(&status(&second, 0, action::ON), t(30));

        // traffic from a known device drops the markers that expired
        registry.apply_status(&status(&known, 0, action::ON), t(61));
        assert!(!registry.is_unknown_pending(&first.key()));
        assert!(registry.is_unknown_pending(&second.key()));

        registry.apply_status(&status(&known, 0, action::OFF), t(90));
        assert!(registry.unknown.is_empty());
    }

    #[test]
    fn test_status_requests_in_key_order() {
        let (a, b) = (device("2"), device("1"));
        let mut registry = registry();
        registry.replace(vec![a.clone(), b.clone()], t(0));
        assert_eq!(
            registry.status_requests(),
            vec![b.status_request(), a.status_request()]
        );
    }
}
