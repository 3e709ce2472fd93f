//! Relay authentication frame
//!
//! The first frame sent on every relay connection carries the session token.
//! The 16 raw token bytes are scattered over fixed offsets of a template;
//! the relay rejects any other layout.

use tracing::debug;

use crate::{
    constants::COMMAND_MAGIC,
    error::{Error, Result},
    frame::{Frame, FRAME_LEN},
};

/// Hex characters of the token that are encoded
pub const TOKEN_HEX_LEN: usize = 32;

/// `(frame offset, token byte)` pairs
const TOKEN_SCATTER: [(usize, usize); 16] = [
    (9, 2),
    (10, 7),
    (12, 12),
    (13, 8),
    (15, 6),
    (16, 3),
    (18, 14),
    (19, 9),
    (20, 15),
    (22, 11),
    (23, 5),
    (24, 13),
    (25, 0),
    (26, 4),
    (27, 10),
    (28, 1),
];

/// Offsets reserved for the home id (always sent as zero)
pub const HOME_ID_OFFSETS: [usize; 4] = [14, 11, 21, 17];

fn template() -> [u8; FRAME_LEN] {
    let mut bytes = [0u8; FRAME_LEN];
    bytes[..8].copy_from_slice(&[COMMAND_MAGIC[0], COMMAND_MAGIC[1], 1, 1, 1, 2, 0xF0, 1]);
    bytes[FRAME_LEN - 1] = 1;
    bytes
}

/// Decode the first 32 hex characters of a token into 16 bytes
fn decode_token(token: &str) -> Result<[u8; 16]> {
    let hex_part = token
        .get(..TOKEN_HEX_LEN)
        .ok_or_else(|| Error::InvalidToken(format!("expected {TOKEN_HEX_LEN} hex characters, got {}", token.len())))?;

    let mut raw = [0u8; 16];
    hex::decode_to_slice(hex_part, &mut raw).map_err(|e| Error::InvalidToken(e.to_string()))?;
    Ok(raw)
}

/// Build the authentication frame for a session token
///
/// # Errors
///
/// Returns [`Error::InvalidToken`] when the token is shorter than 32
/// characters or its first 32 characters are not hex.
///
/// # Examples
///
/// ```
/// use higoal_core::auth::build_auth_frame;
///
/// let frame = build_auth_frame("00112233445566778899aabbccddeeff").unwrap();
/// assert_eq!(frame.as_bytes()[25], 0x00);
/// assert_eq!(frame.as_bytes()[28], 0x11);
/// assert!(frame.verify_checksum());
/// ```
pub fn build_auth_frame(token: &str) -> Result<Frame> {
    let raw = decode_token(token)?;

    let mut bytes = template();
    for (offset, index) in TOKEN_SCATTER {
        bytes[offset] = raw[index];
    }

    debug!("Built auth frame");
    Ok(Frame::new(bytes).seal())
}
