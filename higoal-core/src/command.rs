//! Outbound command frames
//!
//! A command addresses one device by its numeric wire id and type. Status
//! requests leave the entity region empty; action commands write one action
//! byte into the slot of the addressed entity.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::{
    constants::{action, mode, offsets, EntityKind, COMMAND_MAGIC},
    error::{Error, Result},
    frame::{Frame, FRAME_LEN},
};

/// Highest entity index whose position bytes fit before the trailer
pub const MAX_ENTITY_INDEX: usize = FRAME_LEN - 3 - offsets::ENTITY_STATE - offsets::LIVE_POSITION;

/// Header bytes 0..9 of every command frame (mode byte set per command)
const HEADER: [u8; 9] = [
    COMMAND_MAGIC[0],
    COMMAND_MAGIC[1],
    0x01,
    0x01,
    0x01,
    0x02,
    0x01,
    mode::STATUS,
    0x00,
];

fn base_frame(device_id: u32, device_type: i64, mode: u8) -> Result<Frame> {
    if device_id == 0 {
        return Err(Error::InvalidDeviceId(device_id.to_string()));
    }
    if device_type <= 0 {
        return Err(Error::InvalidDeviceType(device_type));
    }

    let mut frame = Frame::zeroed();
    let bytes = frame.as_mut_bytes();
    bytes[..HEADER.len()].copy_from_slice(&HEADER);
    bytes[offsets::MODE] = mode;
    LittleEndian::write_u32(&mut bytes[offsets::IDENTITY..offsets::IDENTITY + 4], device_id);
    bytes[offsets::DEVICE_TYPE] = (device_type & 0xFF) as u8;
    Ok(frame)
}

fn check_entity(index: usize) -> Result<()> {
    if index > MAX_ENTITY_INDEX {
        return Err(Error::EntityOutOfRange {
            index,
            max: MAX_ENTITY_INDEX,
        });
    }
    Ok(())
}

/// Build a read-only status request for a device
///
/// # Errors
///
/// Fails when `device_id` is zero or `device_type` is not positive.
///
/// # Examples
///
/// ```
/// use higoal_core::command::build_status_request;
///
/// let frame = build_status_request(0x0403_0201, 5).unwrap();
/// assert_eq!(&frame.as_bytes()[9..13], &[1, 2, 3, 4]);
/// assert!(build_status_request(0, 5).is_err());
/// ```
pub fn build_status_request(device_id: u32, device_type: i64) -> Result<Frame> {
    let frame = base_frame(device_id, device_type, mode::STATUS)?.seal();
    trace!(device_id, device_type, "Built status request");
    Ok(frame)
}

/// Build an action command writing `action_byte` into the entity slot
///
/// Shutter channels additionally get the direction marker 16 bytes after
/// their slot.
///
/// # Errors
///
/// Fails for an invalid id/type or an entity index that does not fit.
pub fn build_action_command(
    device_id: u32,
    device_type: i64,
    entity_index: usize,
    entity_kind: EntityKind,
    action_byte: u8,
) -> Result<Frame> {
    check_entity(entity_index)?;

    let mut frame = base_frame(device_id, device_type, mode::ACTION)?;
    let bytes = frame.as_mut_bytes();
    let slot = offsets::ENTITY_STATE + entity_index;
    bytes[slot] = action_byte;
    if entity_kind == EntityKind::Shutter {
        bytes[slot + offsets::STORED_POSITION] = action::SHUTTER_DIRECTION;
    }

    trace!(
        device_id,
        entity_index,
        action = action_byte,
        "Built action command"
    );
    Ok(frame.seal())
}

/// Build a dimmer command setting the entity to `percentage` (0..=100)
///
/// Values above 100 are clamped.
pub fn build_percentage_command(
    device_id: u32,
    device_type: i64,
    entity_index: usize,
    percentage: u8,
) -> Result<Frame> {
    let mut frame = build_action_command(
        device_id,
        device_type,
        entity_index,
        EntityKind::Dimmer,
        action::SET_PERCENTAGE,
    )?;
    let slot = offsets::ENTITY_STATE + entity_index + offsets::LIVE_POSITION;
    frame.as_mut_bytes()[slot] = percentage.min(100);
    Ok(frame.seal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_request_layout() {
        let frame = build_status_request(0x0A0B_0C0D, 0x105).unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(&bytes[..9], &[0xAA, 0x5A, 1, 1, 1, 2, 1, 1, 0]);
        assert_eq!(&bytes[9..13], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(bytes[13], 0);
        assert_eq!(bytes[14], 0x05);
        assert!(bytes[15..46].iter().all(|&b| b == 0));
        assert!(frame.verify_checksum());
        assert!(frame.is_command());
    }

    #[test]
    fn test_status_request_identity_round_trip() {
        let id: u32 = 123_456_789;
        let frame = build_status_request(id, 1).unwrap();
        assert_eq!(frame.identity().0, id.to_le_bytes());
    }

    #[test]
    fn test_status_request_known_vector() {
        let frame = build_status_request(1, 1).unwrap();
        assert_eq!(&frame.as_bytes()[46..], &[24, 86]);
    }

    #[test]
    fn test_invalid_id_or_type() {
        assert!(matches!(
            build_status_request(0, 1),
            Err(Error::InvalidDeviceId(_))
        ));
        assert!(matches!(
            build_status_request(1, 0),
            Err(Error::InvalidDeviceType(0))
        ));
        assert!(matches!(
            build_action_command(1, -3, 0, EntityKind::Switch, action::ON),
            Err(Error::InvalidDeviceType(-3))
        ));
    }

    #[test]
    fn test_action_command_switch() {
        let frame = build_action_command(42, 1, 2, EntityKind::Switch, action::ON).unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(bytes[7], mode::ACTION);
        assert_eq!(bytes[20], 255);
        assert_eq!(bytes[36], 0);
        assert!(frame.verify_checksum());
    }

    #[test]
    fn test_action_command_shutter_direction() {
        let frame = build_action_command(42, 3, 1, EntityKind::Shutter, action::OFF).unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(bytes[19], 240);
        assert_eq!(bytes[35], 255);
    }

    #[test]
    fn test_action_command_entity_out_of_range() {
        assert_eq!(MAX_ENTITY_INDEX, 8);
        assert!(build_action_command(42, 1, 8, EntityKind::Switch, action::ON).is_ok());
        assert_eq!(
            build_action_command(42, 1, 9, EntityKind::Switch, action::ON),
            Err(Error::EntityOutOfRange { index: 9, max: 8 })
        );
    }

    #[test]
    fn test_percentage_command() {
        let frame = build_percentage_command(42, 2, 0, 65).unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(bytes[18], 241);
        assert_eq!(bytes[37], 65);
        assert!(frame.verify_checksum());

        let clamped = build_percentage_command(42, 2, 0, 250).unwrap();
        assert_eq!(clamped.as_bytes()[37], 100);
    }
}
