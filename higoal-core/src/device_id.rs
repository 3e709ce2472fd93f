//! Vendor device-id decoding
//!
//! The cloud hands out device ids as strings in which digits may be
//! disguised as upper-case letters. Substituting each letter by its digit
//! and parsing the result yields the numeric id written into outbound frames.

use crate::error::{Error, Result};

/// Digit substituted for each letter `A..=Z`
const LETTER_DIGITS: [u8; 26] = [
    b'4', // A
    b'8', // B
    b'6', // C
    b'0', // D
    b'3', // E
    b'5', // F
    b'4', // G
    b'4', // H
    b'1', // I
    b'1', // J
    b'5', // K
    b'1', // L
    b'3', // M
    b'2', // N
    b'0', // O
    b'9', // P
    b'9', // Q
    b'9', // R
    b'2', // S
    b'7', // T
    b'6', // U
    b'7', // V
    b'3', // W
    b'0', // X
    b'7', // Y
    b'2', // Z
];

/// Substitute a single character, `None` if it is neither a digit nor a
/// mapped letter
fn substitute(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8),
        'A'..='Z' => Some(LETTER_DIGITS[(c as u8 - b'A') as usize]),
        _ => None,
    }
}

/// Decode a vendor device id into the numeric id used in outbound frames
///
/// # Errors
///
/// Returns [`Error::InvalidDeviceId`] when the string is empty, contains a
/// character outside `A..=Z` / `0..=9`, decodes to zero, or does not fit
/// into 32 bits.
///
/// # Examples
///
/// ```
/// use higoal_core::encode_device_id;
///
/// assert_eq!(encode_device_id("12AB").unwrap(), 1248);
/// assert!(encode_device_id("12-4").is_err());
/// ```
pub fn encode_device_id(vendor_id: &str) -> Result<u32> {
    let invalid = || Error::InvalidDeviceId(vendor_id.to_string());

    if vendor_id.is_empty() {
        return Err(invalid());
    }

    let mut value: u32 = 0;
    for c in vendor_id.chars() {
        let digit = substitute(c).ok_or_else(invalid)? - b'0';
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(digit)))
            .ok_or_else(invalid)?;
    }

    if value == 0 {
        return Err(invalid());
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_digits() {
        assert_eq!(encode_device_id("123456").unwrap(), 123_456);
    }

    #[test]
    fn test_letter_groups() {
        assert_eq!(encode_device_id("1DXO").unwrap(), 1000);
        assert_eq!(encode_device_id("IJL").unwrap(), 111);
        assert_eq!(encode_device_id("NSZ").unwrap(), 222);
        assert_eq!(encode_device_id("EWM").unwrap(), 333);
        assert_eq!(encode_device_id("AGH").unwrap(), 444);
        assert_eq!(encode_device_id("FK").unwrap(), 55);
        assert_eq!(encode_device_id("CU").unwrap(), 66);
        assert_eq!(encode_device_id("YVT").unwrap(), 777);
        assert_eq!(encode_device_id("B").unwrap(), 8);
        assert_eq!(encode_device_id("QRP").unwrap(), 999);
    }

    #[test]
    fn test_all_letters() {
        // A..Z -> 4 8 6 0 3 5 4 4 1 1 5 1 3 2 0 9 9 9 2 7 6 7 3 0 7 2
        assert_eq!(encode_device_id("ABCDEFGHI").unwrap(), 486_035_441);
        assert_eq!(encode_device_id("JKLMNOPQR").unwrap(), 151_320_999);
        assert_eq!(encode_device_id("STUVWXYZ").unwrap(), 27_673_072);
    }

    #[test]
    fn test_leading_zero_letters() {
        assert_eq!(encode_device_id("OD42").unwrap(), 42);
    }

    #[test]
    fn test_unmapped_characters() {
        assert!(encode_device_id("12a4").is_err());
        assert!(encode_device_id("12-4").is_err());
        assert!(encode_device_id(" 124").is_err());
        assert!(encode_device_id("").is_err());
    }

    #[test]
    fn test_zero_is_invalid() {
        assert!(matches!(
            encode_device_id("DXO"),
            Err(Error::InvalidDeviceId(_))
        ));
    }

    #[test]
    fn test_overflow_is_invalid() {
        assert_eq!(encode_device_id("4294967295").unwrap(), u32::MAX);
        assert!(encode_device_id("4294967296").is_err());
    }
}
