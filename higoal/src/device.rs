//! Physical devices
//!
//! A device is built from one host-list record. Its routing key is taken
//! from its own status request (frame bytes 9..13), which keeps it distinct
//! from the numeric wire id decoded from the vendor string.

use std::fmt;

use tracing::debug;

use higoal_core::{
    build_action_command, build_percentage_command, build_status_request, command::MAX_ENTITY_INDEX,
    encode_device_id, DeviceKey, EntityKind, Frame,
};
use higoal_types::{model_name, DeviceRecord};

use crate::entity::Entity;
use crate::error::{Error, Result};

/// A physical unit and its entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    key: DeviceKey,
    wire_id: u32,
    id: String,
    device_type: i64,
    name: String,
    room_id: String,
    home_id: String,
    ssid: String,
    mac: String,
    version: String,
    entities: Vec<Entity>,
    status_request: Frame,
    last_status: Option<Frame>,
    reported_offline: bool,
}

impl Device {
    /// Build a device from a host-list record
    ///
    /// Button slots that do not fit in a frame or have an unsupported type
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Fails when the record has no usable id or type, or its button types
    /// do not parse.
    pub fn from_record(record: &DeviceRecord) -> Result<Self> {
        record.validate()?;
        let wire_id = encode_device_id(&record.id)?;
        let status_request = build_status_request(wire_id, record.device_type)?;
        let key = status_request.identity();

        let mut entities = Vec::new();
        for slot in record.button_slots()? {
            if slot.index > MAX_ENTITY_INDEX {
                debug!(device = %record.id, index = slot.index, "Skipping button past last frame slot");
                continue;
            }
            match EntityKind::from_code(slot.code) {
                Some(kind) => entities.push(Entity::new(key, slot.index, slot.name, kind)),
                None => debug!(device = %record.id, code = slot.code, "Skipping unsupported button type"),
            }
        }

        Ok(Self {
            key,
            wire_id,
            id: record.id.clone(),
            device_type: record.device_type,
            name: record.name.clone(),
            room_id: record.room_id.clone(),
            home_id: record.home_id.clone(),
            ssid: record.ssid.clone(),
            mac: record.mac.clone(),
            version: record.version.clone(),
            entities,
            status_request,
            last_status: None,
            reported_offline: false,
        })
    }

    /// Routing key matched against inbound frames
    pub fn key(&self) -> DeviceKey {
        self.key
    }

    /// Numeric id written into outbound frames
    pub fn wire_id(&self) -> u32 {
        self.wire_id
    }

    /// Vendor-encoded id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_type(&self) -> i64 {
        self.device_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn home_id(&self) -> &str {
        &self.home_id
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn model_name(&self) -> &'static str {
        model_name(self.device_type)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity at frame slot `index`
    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.iter().find(|e| e.index() == index)
    }

    /// Entity with the given button name
    pub fn button(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// The other half of a shutter pair
    ///
    /// Only a named shutter has a partner: the entity following it, if that
    /// is also a shutter.
    pub fn related_entity(&self, index: usize) -> Option<&Entity> {
        let position = self.entities.iter().position(|e| e.index() == index)?;
        let entity = &self.entities[position];
        if entity.kind() != EntityKind::Shutter || entity.name().is_empty() {
            return None;
        }
        self.entities
            .get(position + 1)
            .filter(|next| next.kind() == EntityKind::Shutter)
    }

    /// Status request for this device
    pub fn status_request(&self) -> Frame {
        self.status_request
    }

    /// Last masked status frame
    pub fn last_status(&self) -> Option<&Frame> {
        self.last_status.as_ref()
    }

    /// Check if the last reply shows the device reachable
    ///
    /// A device without any reply yet is offline.
    pub fn is_online(&self) -> bool {
        if self.last_status.is_none() || self.reported_offline {
            return false;
        }
        self.entities.is_empty() || self.entities.iter().any(Entity::is_online)
    }

    /// Apply a raw status frame
    ///
    /// The volatile bytes are masked before comparing against the previous
    /// status. Returns the entities whose state or position changed.
    pub(crate) fn apply_status(&mut self, raw: &Frame) -> Vec<Entity> {
        self.reported_offline = raw.is_offline_reply();

        let masked = raw.masked();
        if self.last_status == Some(masked) {
            return Vec::new();
        }
        self.last_status = Some(masked);

        self.entities
            .iter_mut()
            .filter_map(|entity| entity.apply_status(&masked).then(|| entity.clone()))
            .collect()
    }

    fn entity_or_err(&self, index: usize) -> Result<&Entity> {
        self.entity(index).ok_or(Error::UnknownEntity {
            device: self.key,
            index,
        })
    }

    /// Action command for an entity
    pub fn action_frame(&self, index: usize, action_byte: u8) -> Result<Frame> {
        let entity = self.entity_or_err(index)?;
        Ok(build_action_command(
            self.wire_id,
            self.device_type,
            entity.index(),
            entity.kind(),
            action_byte,
        )?)
    }

    /// Dimmer command setting an entity to `value` percent
    pub fn percentage_frame(&self, index: usize, value: u8) -> Result<Frame> {
        let entity = self.entity_or_err(index)?;
        if !entity.can_set_percentage() {
            return Err(Error::NotSupported(format!(
                "entity {} of device {} is not a dimmer",
                index, self.id
            )));
        }
        Ok(build_percentage_command(
            self.wire_id,
            self.device_type,
            entity.index(),
            value,
        )?)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[{} {}: {} ({}), {} entities]",
            self.key,
            self.id,
            self.name,
            self.model_name(),
            self.entities.len()
        )
    }
}
