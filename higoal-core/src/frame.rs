//! Higoal protocol frame
//!
//! Every message exchanged with the relay, in both directions, is a fixed
//! 48-byte frame with no length prefix.

use std::fmt;

use crate::{
    checksum,
    constants::{offsets, COMMAND_MAGIC, OFFLINE_REPLY, STATUS_MAGIC},
    error::{Error, Result},
};

/// Frame length in bytes
pub const FRAME_LEN: usize = 48;

/// Fixed-size protocol frame
///
/// # Frame Structure
///
/// ```text
/// ┌────────┬──────────┬──────────┬──────┬──────────┬─────────┬───────────┬──────────┐
/// │ Magic  │  Header  │   Mode   │ Pad  │ Identity │  Type   │  Entity   │ Checksum │
/// │ 0..2   │  2..7    │    7     │  8   │  9..13   │   14    │  18..46   │  46..48  │
/// └────────┴──────────┴──────────┴──────┴──────────┴─────────┴───────────┴──────────┘
/// ```
///
/// The checksum covers bytes `[2, 20]` only.
///
/// # Examples
///
/// ```
/// use higoal_core::Frame;
///
/// let frame = Frame::zeroed();
/// assert_eq!(frame.as_bytes().len(), 48);
/// assert!(!frame.is_status());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// All-zero synthetic frame
    pub const fn zeroed() -> Self {
        Self([0; FRAME_LEN])
    }

    /// Wrap raw frame bytes
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a frame from a buffer that must be exactly one frame long
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrameLength`] for any other length.
    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        let bytes: [u8; FRAME_LEN] = buf.try_into().map_err(|_| Error::InvalidFrameLength {
            expected: FRAME_LEN,
            actual: buf.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Parse a status payload, falling back to a zeroed frame for any
    /// buffer of the wrong length
    pub fn from_status_payload(buf: &[u8]) -> Self {
        Self::from_slice(buf).unwrap_or_else(|_| Self::zeroed())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Mutable raw bytes
    pub fn as_mut_bytes(&mut self) -> &mut [u8; FRAME_LEN] {
        &mut self.0
    }

    /// Byte at `offset`, `None` past the end
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.0.get(offset).copied()
    }

    /// Check if this is a status reply from the relay
    pub fn is_status(&self) -> bool {
        self.0[0] == STATUS_MAGIC[0] && self.0[1] == STATUS_MAGIC[1]
    }

    /// Check if this is an outbound command frame
    pub fn is_command(&self) -> bool {
        self.0[0] == COMMAND_MAGIC[0] && self.0[1] == COMMAND_MAGIC[1]
    }

    /// Check if the relay reports the addressed device as offline
    pub fn is_offline_reply(&self) -> bool {
        self.0[4..9] == OFFLINE_REPLY
    }

    /// Routing identity (bytes 9..13, verbatim)
    pub fn identity(&self) -> DeviceKey {
        let i = offsets::IDENTITY;
        DeviceKey([self.0[i], self.0[i + 1], self.0[i + 2], self.0[i + 3]])
    }

    /// Device type byte
    pub fn device_type(&self) -> u8 {
        self.0[offsets::DEVICE_TYPE]
    }

    /// Compute the checksum trailer over the checksummed region
    pub fn checksum(&self) -> [u8; 2] {
        checksum::calculate(&self.0, offsets::CHECKSUM_START, offsets::CHECKSUM_END)
    }

    /// Check the trailer against the checksummed region
    pub fn verify_checksum(&self) -> bool {
        checksum::verify(
            &self.0,
            offsets::CHECKSUM_START,
            offsets::CHECKSUM_END,
            [self.0[FRAME_LEN - 2], self.0[FRAME_LEN - 1]],
        )
    }

    /// Write the checksum trailer into the last two bytes
    pub fn seal(mut self) -> Self {
        let [a, b] = self.checksum();
        self.0[FRAME_LEN - 2] = a;
        self.0[FRAME_LEN - 1] = b;
        self
    }

    /// Copy with the volatile bytes (header noise and checksum) zeroed
    pub fn masked(&self) -> Self {
        let mut bytes = self.0;
        for offset in offsets::VOLATILE {
            bytes[offset] = 0;
        }
        Self(bytes)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Frame {
    type Error = Error;

    fn try_from(buf: &[u8]) -> Result<Self> {
        Self::from_slice(buf)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", hex::encode(self.0))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_status() {
            "status"
        } else if self.is_command() {
            "command"
        } else {
            "unknown"
        };
        write!(
            f,
            "Frame[{}](device={}, type={})",
            kind,
            self.identity(),
            self.device_type()
        )
    }
}

/// Four identity bytes routing a status reply to a known device
///
/// This is the raw frame slice, not the numeric wire id decoded from the
/// vendor device string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey(pub [u8; 4]);

impl DeviceKey {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
