//! Base-128 varint encoding
//!
//! Little-endian groups of 7 bits, high bit set on every byte except the last.

use crate::{Error, Result};

/// Longest encoding of a `u64`
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` into a fresh buffer
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    encode_into(value, &mut out);
    out
}

/// Append the encoding of `value` to `out`
pub fn encode_into(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes `encode(value)` produces
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Decode a varint starting at `offset`.
///
/// Returns the value and the number of bytes consumed. Never reads past the end of `buf`.
pub fn decode(buf: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;

    for (i, byte) in buf.iter().skip(offset).take(MAX_VARINT_LEN).enumerate() {
        let group = u64::from(byte & 0x7f);
        let shift = 7 * i as u32;

        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(Error::protocol_decode(format!(
                "varint at offset {} overflows 64 bits",
                offset
            )));
        }

        value |= group << shift;

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    if buf.len().saturating_sub(offset) >= MAX_VARINT_LEN {
        Err(Error::protocol_decode(format!(
            "varint at offset {} is longer than {} bytes",
            offset, MAX_VARINT_LEN
        )))
    } else {
        Err(Error::protocol_decode(format!(
            "truncated varint at offset {}",
            offset
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(1, &[0x01])]
    #[case(127, &[0x7f])]
    #[case(128, &[0x80, 0x01])]
    #[case(300, &[0xac, 0x02])]
    #[case(16_384, &[0x80, 0x80, 0x01])]
    fn test_known_encodings(#[case] value: u64, #[case] bytes: &[u8]) {
        assert_eq!(encode(value), bytes);
        assert_eq!(decode(bytes, 0).unwrap(), (value, bytes.len()));
    }

    #[test]
    fn test_round_trip_across_widths() {
        let mut values = vec![0u64, u64::MAX, u64::from(u32::MAX), 9_007_199_254_740_991];
        values.extend((0..64).map(|shift| 1u64 << shift));
        values.extend((1..64).map(|shift| (1u64 << shift) - 1));

        for value in values {
            let bytes = encode(value);
            assert_eq!(bytes.len(), encoded_len(value), "length of {}", value);
            assert_eq!(decode(&bytes, 0).unwrap(), (value, bytes.len()), "value {}", value);
        }
    }

    #[test]
    fn test_decode_from_offset() {
        let buf = [0xff, 0xff, 0xac, 0x02, 0x09];
        assert_eq!(decode(&buf, 2).unwrap(), (300, 2));
        assert_eq!(decode(&buf, 4).unwrap(), (9, 1));
    }

    #[test]
    fn test_truncated_input() {
        let err = decode(&[0x80, 0x80], 0).unwrap_err();
        assert!(err.to_string().contains("truncated"));

        assert!(decode(&[0x01], 1).is_err());
        assert!(decode(&[], 0).is_err());
    }

    #[test]
    fn test_overlong_input() {
        let buf = [0xff; 11];
        assert!(decode(&buf, 0).is_err());

        let mut overflow = vec![0xff; 9];
        overflow.push(0x02);
        assert!(decode(&overflow, 0).is_err());
    }
}
