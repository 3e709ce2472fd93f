//! Higoal frame checksum
//!
//! Each frame ends with two bytes, each a CRC-8 style digest of the same
//! byte range keyed by a different secret constant:
//! 1. Start with an accumulator of 0
//! 2. For every byte in `[start, end]`, XOR it into the accumulator
//! 3. Shift right eight times, XOR-ing in the secret whenever a 1 bit falls out
//! 4. The accumulator is the checksum byte

use tracing::trace;

use crate::constants::CHECKSUM_SECRETS;

/// Compute one checksum byte over `data[start..=end]` keyed by `secret`
///
/// Returns 0 without computing when the range is degenerate: `start` at or
/// past the last byte, `end` past the last byte, or `end <= start`.
///
/// # Examples
///
/// ```
/// use higoal_core::checksum;
///
/// let data = [0u8; 48];
/// assert_eq!(checksum::compute(&data, 2, 20, 28), 0);
/// assert_eq!(checksum::compute(&data, 20, 2, 28), 0);
/// ```
pub fn compute(data: &[u8], start: usize, end: usize, secret: u8) -> u8 {
    let Some(last) = data.len().checked_sub(1) else {
        return 0;
    };
    if start >= last || end > last || end <= start {
        return 0;
    }

    let mut acc: u8 = 0;
    for &byte in &data[start..=end] {
        acc ^= byte;
        for _ in 0..8 {
            let carry = acc & 1;
            acc >>= 1;
            if carry != 0 {
                acc ^= secret;
            }
        }
    }
    acc
}

/// Compute the two-byte checksum trailer over `data[start..=end]`
///
/// # Examples
///
/// ```
/// use higoal_core::checksum;
///
/// let mut data = [0u8; 48];
/// data[2] = 1;
/// let trailer = checksum::calculate(&data, 2, 20);
/// assert_eq!(trailer, checksum::calculate(&data, 2, 20));
/// ```
pub fn calculate(data: &[u8], start: usize, end: usize) -> [u8; 2] {
    let trailer = [
        compute(data, start, end, CHECKSUM_SECRETS[0]),
        compute(data, start, end, CHECKSUM_SECRETS[1]),
    ];

    trace!(
        start = start,
        end = end,
        checksum = format!("{:02X}{:02X}", trailer[0], trailer[1]),
        "Calculated checksum"
    );

    trailer
}

/// Verify a trailer against `data[start..=end]`
pub fn verify(data: &[u8], start: usize, end: usize, expected: [u8; 2]) -> bool {
    calculate(data, start, end) == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_single_bit() {
        // 0x01 -> shift out 1, fold 28 -> ... seven more rounds
        let data = [0u8, 0, 1, 0];
        assert_eq!(compute(&data, 2, 3, 28), 14);
    }

    #[test]
    fn test_checksum_zero_data() {
        let data = [0u8; 48];
        assert_eq!(calculate(&data, 2, 20), [0, 0]);
    }

    #[test]
    fn test_checksum_secrets_differ() {
        let mut data = [0u8; 48];
        data[5] = 0x42;
        let [a, b] = calculate(&data, 2, 20);
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_degenerate_ranges() {
        let data = [0xFFu8; 48];
        // end <= start
        assert_eq!(calculate(&data, 10, 10), [0, 0]);
        assert_eq!(calculate(&data, 10, 5), [0, 0]);
        // start at the last byte
        assert_eq!(calculate(&data, 47, 47), [0, 0]);
        // end past the last byte
        assert_eq!(calculate(&data, 2, 48), [0, 0]);
        // empty buffer
        assert_eq!(calculate(&[], 0, 1), [0, 0]);
    }

    #[test]
    fn test_checksum_range_reaches_last_byte() {
        let mut data = [0u8; 48];
        data[47] = 0x80;
        assert_ne!(calculate(&data, 2, 47), [0, 0]);
    }

    #[test]
    fn test_checksum_verify() {
        let mut data = [0u8; 48];
        data[9] = 0x12;
        data[14] = 0x05;
        let trailer = calculate(&data, 2, 20);

        assert!(verify(&data, 2, 20, trailer));
        assert!(!verify(&data, 2, 20, [trailer[0] ^ 1, trailer[1]]));
    }

    #[test]
    fn test_checksum_spot_sample_detects_changes() {
        let mut base = [0u8; 48];
        for (i, b) in base.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37);
        }
        let reference = calculate(&base, 2, 20);

        for index in 2..=20 {
            let mut changed = base;
            changed[index] ^= 0x5A;
            assert_ne!(
                calculate(&changed, 2, 20),
                reference,
                "flipping byte {index} went undetected"
            );
        }
    }

    #[test]
    fn test_checksum_ignores_bytes_outside_range() {
        let mut data = [0u8; 48];
        data[3] = 7;
        let before = calculate(&data, 2, 20);
        data[21] = 0xFF;
        data[46] = 0xAA;
        assert_eq!(calculate(&data, 2, 20), before);
    }

    proptest! {
        #[test]
        fn prop_checksum_is_deterministic(
            data in proptest::collection::vec(any::<u8>(), 48),
            start in 0usize..47,
            len in 1usize..47,
        ) {
            let end = (start + len).min(47);
            prop_assert_eq!(calculate(&data, start, end), calculate(&data, start, end));
        }

        #[test]
        fn prop_bytes_outside_range_ignored(
            data in proptest::collection::vec(any::<u8>(), 48),
            index in 21usize..48,
            flip in any::<u8>(),
        ) {
            let mut changed = data.clone();
            changed[index] ^= flip;
            prop_assert_eq!(calculate(&data, 2, 20), calculate(&changed, 2, 20));
        }
    }
}
