//! Entities (buttons) of a device
//!
//! Every read accessor is derived from the last status frame the entity saw.
//! An entity that has not seen one yet reads an all-zero frame.

use higoal_core::{
    constants::{action, offsets},
    DeviceKey, EntityKind, Frame,
};

/// One addressable output of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    index: usize,
    name: String,
    kind: EntityKind,
    device: DeviceKey,
    status: Option<Frame>,
}

impl Entity {
    pub(crate) fn new(device: DeviceKey, index: usize, name: String, kind: EntityKind) -> Self {
        Self {
            index,
            name,
            kind,
            device,
            status: None,
        }
    }

    /// Slot of this entity in the device's frames
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Routing key of the owning device
    pub fn device_key(&self) -> DeviceKey {
        self.device
    }

    /// Last status frame, or a zeroed frame if none arrived yet
    pub fn status(&self) -> Frame {
        self.status.unwrap_or_default()
    }

    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    fn byte(&self, offset: usize) -> u8 {
        self.status().get(offsets::ENTITY_STATE + self.index + offset).unwrap_or(0)
    }

    /// Raw state byte
    pub fn state(&self) -> u8 {
        self.byte(0)
    }

    pub fn is_turned_on(&self) -> bool {
        self.state() == action::ON
    }

    pub fn is_online(&self) -> bool {
        self.state() != action::OFFLINE
    }

    pub fn can_set_percentage(&self) -> bool {
        self.kind == EntityKind::Dimmer
    }

    /// Position in `0.0..=1.0` for dimmers and shutters
    ///
    /// For shutters 1.0 means fully closed. The stored position is used
    /// unless the position flag is set, in which case the live one is.
    pub fn percentage(&self) -> Option<f64> {
        if !matches!(self.kind, EntityKind::Dimmer | EntityKind::Shutter) {
            return None;
        }

        let value = if self.byte(offsets::POSITION_FLAG) != 0 {
            self.byte(offsets::LIVE_POSITION)
        } else {
            self.byte(offsets::STORED_POSITION)
        };
        Some(f64::from(value.min(100)) / 100.0)
    }

    /// Action byte for "on"
    ///
    /// The unnamed channel of a shutter pair drives the opposite direction
    /// and uses the off value.
    pub fn on_action(&self) -> u8 {
        if self.kind == EntityKind::Shutter && self.name.is_empty() {
            action::OFF
        } else {
            action::ON
        }
    }

    /// Action byte for "off"; shutters stop by repeating the on action
    pub fn off_action(&self) -> u8 {
        if self.kind == EntityKind::Shutter {
            self.on_action()
        } else {
            action::OFF
        }
    }

    /// Store a status frame, returning whether the state or live position byte changed
    pub(crate) fn apply_status(&mut self, frame: &Frame) -> bool {
        let old_state = self.state();
        let old_position = self.byte(offsets::LIVE_POSITION);

        self.status = Some(*frame);

        old_state != self.state() || old_position != self.byte(offsets::LIVE_POSITION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(index: usize, name: &str, kind: EntityKind) -> Entity {
        Entity::new(DeviceKey([1, 0, 0, 0]), index, name.to_string(), kind)
    }

    fn frame_with(values: &[(usize, u8)]) -> Frame {
        let mut frame = Frame::zeroed();
        for &(offset, value) in values {
            frame.as_mut_bytes()[offset] = value;
        }
        frame
    }

    #[test]
    fn test_reads_zero_frame_without_status() {
        let lamp = entity(0, "Lamp", EntityKind::Switch);
        assert!(!lamp.has_status());
        assert!(!lamp.is_turned_on());
        assert!(!lamp.is_online());
        assert_eq!(lamp.percentage(), None);
    }

    #[test]
    fn test_switch_state() {
        let mut lamp = entity(2, "Lamp", EntityKind::Switch);

        assert!(lamp.apply_status(&frame_with(&[(20, 255)])));
        assert!(lamp.is_turned_on());
        assert!(lamp.is_online());

        assert!(lamp.apply_status(&frame_with(&[(20, 240)])));
        assert!(!lamp.is_turned_on());
        assert!(lamp.is_online());
    }

    #[test]
    fn test_change_detection_ignores_other_slots() {
        let mut lamp = entity(0, "Lamp", EntityKind::Switch);
        assert!(lamp.apply_status(&frame_with(&[(18, 255)])));
        assert!(!lamp.apply_status(&frame_with(&[(18, 255), (19, 255)])));
        // live position byte of slot 0
        assert!(lamp.apply_status(&frame_with(&[(18, 255), (37, 40)])));
    }

    #[test]
    fn test_dimmer_percentage() {
        let mut dimmer = entity(1, "Dimmer", EntityKind::Dimmer);

        // stored position at 18+1+16
        dimmer.apply_status(&frame_with(&[(19, 255), (35, 30), (38, 80)]));
        assert_eq!(dimmer.percentage(), Some(0.3));

        // flag at 18+1+8 selects live position at 18+1+19
        dimmer.apply_status(&frame_with(&[(19, 255), (27, 1), (35, 30), (38, 80)]));
        assert_eq!(dimmer.percentage(), Some(0.8));

        dimmer.apply_status(&frame_with(&[(35, 250)]));
        assert_eq!(dimmer.percentage(), Some(1.0));
    }

    #[test]
    fn test_actions() {
        let lamp = entity(0, "Lamp", EntityKind::Switch);
        assert_eq!(lamp.on_action(), 255);
        assert_eq!(lamp.off_action(), 240);

        let open = entity(0, "Blind", EntityKind::Shutter);
        assert_eq!(open.on_action(), 255);
        assert_eq!(open.off_action(), 255);

        let close = entity(1, "", EntityKind::Shutter);
        assert_eq!(close.on_action(), 240);
        assert_eq!(close.off_action(), 240);

        assert!(!open.can_set_percentage());
        assert!(entity(0, "Dim", EntityKind::Dimmer).can_set_percentage());
    }
}
