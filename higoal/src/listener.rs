//! Change notifications
//!
//! Listeners are called from the frame-processing path and must not block.
//! [`EventChannel`] forwards every notification over a channel for consumers
//! that would rather receive events on their own task.

use tokio::sync::mpsc;

use crate::device::Device;
use crate::entity::Entity;

/// Receiver of device and entity changes
pub trait Listener: Send + Sync {
    fn on_entity_changed(&self, entity: &Entity);

    fn on_device_added(&self, _device: &Device) {}

    fn on_device_removed(&self, _device: &Device) {}
}

/// A change, as delivered by [`EventChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    EntityChanged(Entity),
    DeviceAdded(Device),
    DeviceRemoved(Device),
}

/// Listener forwarding events to an unbounded channel
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl EventChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ManagerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ManagerEvent) {
        // Receiver gone; nothing left to notify
        let _ = self.tx.send(event);
    }
}

impl Listener for EventChannel {
    fn on_entity_changed(&self, entity: &Entity) {
        self.forward(ManagerEvent::EntityChanged(entity.clone()));
    }

    fn on_device_added(&self, device: &Device) {
        self.forward(ManagerEvent::DeviceAdded(device.clone()));
    }

    fn on_device_removed(&self, device: &Device) {
        self.forward(ManagerEvent::DeviceRemoved(device.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use higoal_types::DeviceRecord;

    #[test]
    fn test_event_channel_forwards() {
        let device = Device::from_record(&DeviceRecord {
            id: "12".into(),
            device_type: 5,
            button_name: "Lamp".into(),
            button_type: "1".into(),
            ..Default::default()
        })
        .unwrap();

        let (channel, mut rx) = EventChannel::new();
        channel.on_device_added(&device);
        channel.on_entity_changed(&device.entities()[0]);
        channel.on_device_removed(&device);

        assert_eq!(rx.try_recv().unwrap(), ManagerEvent::DeviceAdded(device.clone()));
        assert!(matches!(rx.try_recv().unwrap(), ManagerEvent::EntityChanged(e) if e.name() == "Lamp"));
        assert_eq!(rx.try_recv().unwrap(), ManagerEvent::DeviceRemoved(device));
    }

    #[test]
    fn test_event_channel_survives_dropped_receiver() {
        let (channel, rx) = EventChannel::new();
        drop(rx);
        let device = Device::from_record(&DeviceRecord {
            id: "12".into(),
            device_type: 5,
            ..Default::default()
        })
        .unwrap();
        channel.on_device_added(&device);
    }
}
