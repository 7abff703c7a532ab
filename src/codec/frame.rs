//! gRPC-Web length-prefixed framing
//!
//! Each frame is one flag byte followed by a 4-byte big-endian payload length.

use crate::{Error, Result};

/// Size of the frame header
pub const FRAME_HEADER_LEN: usize = 5;

/// Flag byte of a data frame
pub const DATA_FRAME_FLAG: u8 = 0x00;

/// Flag byte of a trailer frame (`grpc-status`, `grpc-message`)
pub const TRAILER_FRAME_FLAG: u8 = 0x80;

/// Wrap `payload` in a data frame header
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::protocol_decode("frame payload exceeds u32 length"))?;

    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.push(DATA_FRAME_FLAG);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Flag byte and declared payload length of the frame at the start of `buf`
pub fn read_header(buf: &[u8]) -> Result<(u8, u32)> {
    match buf {
        [flag, a, b, c, d, ..] => Ok((*flag, u32::from_be_bytes([*a, *b, *c, *d]))),
        _ => Err(Error::protocol_decode(format!(
            "frame shorter than {} byte header ({} bytes)",
            FRAME_HEADER_LEN,
            buf.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame() {
        let frame = encode_frame(&[0x08, 0x96, 0x01]).unwrap();
        assert_eq!(frame, vec![0x00, 0x00, 0x00, 0x00, 0x03, 0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_length_uses_all_four_bytes() {
        let payload = vec![0u8; 300];
        let frame = encode_frame(&payload).unwrap();
        assert_eq!(&frame[..FRAME_HEADER_LEN], &[0x00, 0x00, 0x00, 0x01, 0x2c]);
        assert_eq!(read_header(&frame).unwrap(), (DATA_FRAME_FLAG, 300));
    }

    #[test]
    fn test_read_header_short_buffer() {
        assert!(read_header(&[0x00, 0x00, 0x00]).is_err());
    }
}
