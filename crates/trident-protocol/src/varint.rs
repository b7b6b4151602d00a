//! `VarInt` encoding/decoding.
//!
//! Each byte carries 7 bits of data, least significant group first, and
//! uses the high bit to indicate that more bytes follow. A 32-bit value
//! takes at most 5 bytes, and only the low 4 bits of the 5th byte may be set.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, Result};

/// Segment bits mask (lower 7 bits).
pub(crate) const SEGMENT_BITS: u8 = 0x7F;

/// Continue bit (high bit).
pub(crate) const CONTINUE_BIT: u8 = 0x80;

/// Maximum encoded length of a `VarInt`.
pub const MAX_VARINT_LEN: usize = 5;

/// Shift of the 5th byte; only 4 bits remain to fill at this position.
const LAST_SHIFT: u32 = 28;

/// Incremental `VarInt` decoder shared by the buffer and stream readers.
#[derive(Debug, Default)]
pub(crate) struct VarIntDecoder {
    value: i32,
    position: u32,
}

impl VarIntDecoder {
    /// Feed one byte. Returns the decoded value once the final byte is seen.
    pub(crate) fn push(&mut self, byte: u8) -> Result<Option<i32>> {
        // The 5th byte may neither continue nor carry bits past bit 31.
        if self.position == LAST_SHIFT && byte > 0x0F {
            return Err(ProtocolError::VarIntTooLong);
        }

        self.value |= i32::from(byte & SEGMENT_BITS) << self.position;

        if byte & CONTINUE_BIT == 0 {
            return Ok(Some(self.value));
        }

        self.position += 7;
        Ok(None)
    }
}

/// Read a `VarInt` from an async reader.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs (including EOF mid-sequence)
/// - The `VarInt` is longer than 5 bytes or overflows 32 bits
pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32> {
    let mut decoder = VarIntDecoder::default();

    loop {
        let byte = reader.read_u8().await?;
        if let Some(value) = decoder.push(byte)? {
            return Ok(value);
        }
    }
}

/// Calculate the number of bytes needed to encode a `VarInt`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn varint_len(value: i32) -> usize {
    let value = value as u32;

    if value == 0 {
        return 1;
    }

    let bits_needed = 32 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn read_all(bytes: Vec<u8>) -> Result<i32> {
        read_varint(&mut Cursor::new(bytes)).await
    }

    #[test]
    fn test_varint_len() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(1), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(16383), 2);
        assert_eq!(varint_len(16384), 3);
        assert_eq!(varint_len(2_097_151), 3);
        assert_eq!(varint_len(2_097_152), 4);
        assert_eq!(varint_len(268_435_455), 4);
        assert_eq!(varint_len(268_435_456), 5);
        assert_eq!(varint_len(i32::MAX), 5);
        // Negative numbers always use 5 bytes
        assert_eq!(varint_len(-1), 5);
        assert_eq!(varint_len(i32::MIN), 5);
    }

    #[tokio::test]
    async fn test_read_known_values() {
        assert_eq!(read_all(vec![0x00]).await.unwrap(), 0);
        assert_eq!(read_all(vec![0xdd, 0xc7, 0x01]).await.unwrap(), 25565);
        assert_eq!(
            read_all(vec![0xff, 0xff, 0xff, 0xff, 0x0f]).await.unwrap(),
            -1
        );
        assert_eq!(
            read_all(vec![0x80, 0x80, 0x80, 0x80, 0x08]).await.unwrap(),
            i32::MIN
        );
    }

    #[tokio::test]
    async fn test_varint_too_long() {
        let result = read_all(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).await;
        assert!(matches!(result, Err(ProtocolError::VarIntTooLong)));
    }

    #[tokio::test]
    async fn test_fifth_byte_overflow() {
        // Five bytes, terminated, but the last byte carries bits 32..34.
        let result = read_all(vec![0xff, 0xff, 0xff, 0xff, 0x7f]).await;
        assert!(matches!(result, Err(ProtocolError::VarIntTooLong)));
    }

    #[tokio::test]
    async fn test_eof_mid_sequence() {
        let result = read_all(vec![0x80, 0x80]).await;
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }
}
