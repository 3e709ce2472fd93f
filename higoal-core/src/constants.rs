//! Protocol constants

/// Magic bytes opening every outbound command frame
pub const COMMAND_MAGIC: [u8; 2] = [0xAA, 0x5A];

/// Magic bytes opening a status reply from the relay
pub const STATUS_MAGIC: [u8; 2] = [0xBB, 0x5B];

/// Mode byte (offset 7) values
pub mod mode {
    /// Read-only status request
    pub const STATUS: u8 = 0x01;

    /// Action command
    pub const ACTION: u8 = 0x02;
}

/// Byte offsets inside a frame
pub mod offsets {
    /// Mode byte (status request / action)
    pub const MODE: usize = 7;

    /// First byte of the 4-byte device identity
    pub const IDENTITY: usize = 9;

    /// Device type byte
    pub const DEVICE_TYPE: usize = 14;

    /// First per-entity state byte
    pub const ENTITY_STATE: usize = 18;

    /// Distance from an entity's state byte to its stored position byte
    /// (also the shutter direction flag in commands)
    pub const STORED_POSITION: usize = 16;

    /// Distance from an entity's state byte to its live position byte
    pub const LIVE_POSITION: usize = 19;

    /// Distance from an entity's state byte to the flag that selects the
    /// live position over the stored one
    pub const POSITION_FLAG: usize = 8;

    /// Checksummed region, inclusive
    pub const CHECKSUM_START: usize = 2;
    pub const CHECKSUM_END: usize = 20;

    /// Bytes that vary between otherwise identical replies
    pub const VOLATILE: [usize; 5] = [2, 3, 4, 46, 47];
}

/// Secret constants keying the two checksum bytes
pub const CHECKSUM_SECRETS: [u8; 2] = [28, 122];

/// Entity state / action values
pub mod action {
    /// Output on (also "move" for shutters)
    pub const ON: u8 = 255;

    /// Output off
    pub const OFF: u8 = 240;

    /// Set dimmer percentage
    pub const SET_PERCENTAGE: u8 = 241;

    /// Entity state byte reported for an unreachable output
    pub const OFFLINE: u8 = 0;

    /// Marker written at the shutter direction offset
    pub const SHUTTER_DIRECTION: u8 = 255;
}

/// Relay reply bytes 4..9 reporting that the addressed device is offline
pub const OFFLINE_REPLY: [u8; 5] = [1, 1, 1, 1, 13];

/// Default relay TCP port
pub const DEFAULT_RELAY_PORT: u16 = 17670;

/// Default cloud API port
pub const DEFAULT_API_PORT: u16 = 8143;

/// Default vendor domain
pub const DEFAULT_DOMAIN: &str = "server.higoal.net";

/// Client version reported at sign-in
pub const CLIENT_VERSION: &str = "V3.21.1";

/// Entity (button) types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityKind {
    Switch = 1,
    Dimmer = 2,
    Shutter = 3,
}

impl EntityKind {
    /// Map a vendor button-type code, `None` for unsupported codes
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Switch),
            2 => Some(Self::Dimmer),
            3 => Some(Self::Shutter),
            _ => None,
        }
    }

    /// Wire code
    pub fn code(self) -> u8 {
        self as u8
    }
}
