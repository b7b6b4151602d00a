//! Primitive codec and packet framing.
//!
//! Packets on the wire are framed in one of two ways (see [`WireFormat`]):
//! - `[VarInt length][VarInt packet_id][payload...]`
//! - `[i32 packet_id][payload...]` with no length prefix
//!
//! In the framed layout the length includes the packet ID and payload,
//! but not itself. Fixed-width integers are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, Result};
use crate::packets::Packet;
use crate::varint::{CONTINUE_BIT, SEGMENT_BITS, VarIntDecoder, read_varint, varint_len};

/// Maximum packet size (2 MiB, same as vanilla).
pub const MAX_PACKET_SIZE: usize = 2 * 1024 * 1024;

/// Outbound framing layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// `[VarInt length][VarInt id][body]`.
    #[default]
    Framed,
    /// `[i32 id][body]`, used before length framing is negotiated.
    Unframed,
}

/// A raw packet with its ID and payload.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// The packet ID.
    pub id: i32,
    /// The packet payload (without the packet ID).
    pub payload: Bytes,
}

impl RawPacket {
    /// Create a new raw packet with the given ID and payload.
    #[must_use]
    pub const fn new(id: i32, payload: Bytes) -> Self {
        Self { id, payload }
    }

    /// Split a packet body of the form `[VarInt id][payload]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is missing or malformed.
    pub fn parse(mut data: Bytes) -> Result<Self> {
        let id = read_varint_from_buf(&mut data)?;
        Ok(Self { id, payload: data })
    }
}

/// Read a length-framed raw packet from an async reader.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs
/// - The packet length is negative or exceeds [`MAX_PACKET_SIZE`]
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<RawPacket> {
    let length = read_varint(reader).await?;
    let length = usize::try_from(length).map_err(|_| ProtocolError::NegativeLength(length))?;

    if length > MAX_PACKET_SIZE {
        return Err(ProtocolError::PacketTooLong {
            len: length,
            max: MAX_PACKET_SIZE,
        });
    }

    let mut data = vec![0u8; length];
    reader.read_exact(&mut data).await?;

    RawPacket::parse(Bytes::from(data))
}

/// Encode a packet's id and body in the given wire format.
///
/// # Errors
///
/// Returns an error if the packet cannot be encoded (for example an
/// inbound-only packet) or the result exceeds [`MAX_PACKET_SIZE`].
pub fn encode_packet(packet: &dyn Packet, format: WireFormat) -> Result<BytesMut> {
    let mut body = BytesMut::new();
    packet.encode(&mut body)?;

    match format {
        WireFormat::Framed => {
            let id_len = varint_len(packet.id());
            let total_len = id_len + body.len();
            if total_len > MAX_PACKET_SIZE {
                return Err(ProtocolError::PacketTooLong {
                    len: total_len,
                    max: MAX_PACKET_SIZE,
                });
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let total_len_i32 = total_len as i32;

            let mut frame = BytesMut::with_capacity(varint_len(total_len_i32) + total_len);
            write_varint_to_buf(&mut frame, total_len_i32);
            write_varint_to_buf(&mut frame, packet.id());
            frame.extend_from_slice(&body);
            Ok(frame)
        }
        WireFormat::Unframed => {
            let mut frame = BytesMut::with_capacity(4 + body.len());
            frame.put_i32(packet.id());
            frame.extend_from_slice(&body);
            Ok(frame)
        }
    }
}

/// Fail unless at least `needed` bytes remain.
fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<()> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(ProtocolError::UnexpectedEof { needed, remaining });
    }
    Ok(())
}

/// Read a `VarInt` from a buffer.
///
/// # Errors
///
/// Returns an error if the `VarInt` is malformed or the buffer ends
/// mid-sequence.
pub fn read_varint_from_buf(buf: &mut impl Buf) -> Result<i32> {
    let mut decoder = VarIntDecoder::default();

    loop {
        ensure_remaining(buf, 1)?;
        if let Some(value) = decoder.push(buf.get_u8())? {
            return Ok(value);
        }
    }
}

/// Write a `VarInt` to a buffer.
///
/// Negative values are written as their unsigned 32-bit pattern (5 bytes).
#[allow(clippy::cast_sign_loss)]
pub fn write_varint_to_buf(buf: &mut impl BufMut, value: i32) {
    let mut value = value as u32;

    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & u32::from(SEGMENT_BITS)) as u8;
        value >>= 7;

        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Read a string from a buffer.
///
/// Strings are `[VarInt byte length][UTF-8 bytes]`. `max_len` is counted in
/// characters, so up to `max_len * 4` bytes are accepted.
///
/// # Errors
///
/// Returns an error if the length prefix is invalid or exceeds the maximum,
/// fewer bytes remain than declared, or the bytes are not UTF-8.
pub fn read_string(buf: &mut impl Buf, max_len: usize) -> Result<String> {
    let len = read_varint_from_buf(buf)?;
    let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;

    let max_bytes = max_len.saturating_mul(4);
    if len > max_bytes {
        return Err(ProtocolError::StringTooLong {
            len,
            max: max_bytes,
        });
    }

    ensure_remaining(buf, len)?;
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);

    Ok(String::from_utf8(bytes)?)
}

/// Write a string to a buffer.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    let bytes = s.as_bytes();
    write_varint_to_buf(buf, bytes.len() as i32);
    buf.put_slice(bytes);
}

/// Read a signed byte.
///
/// # Errors
///
/// Returns an error if the buffer is empty.
pub fn read_i8(buf: &mut impl Buf) -> Result<i8> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_i8())
}

/// Read a big-endian `i16`.
///
/// # Errors
///
/// Returns an error if fewer than 2 bytes remain.
pub fn read_i16(buf: &mut impl Buf) -> Result<i16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_i16())
}

/// Read a big-endian `u16`.
///
/// # Errors
///
/// Returns an error if fewer than 2 bytes remain.
pub fn read_u16(buf: &mut impl Buf) -> Result<u16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16())
}

/// Read a big-endian `i32`.
///
/// # Errors
///
/// Returns an error if fewer than 4 bytes remain.
pub fn read_i32(buf: &mut impl Buf) -> Result<i32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_i32())
}

/// Read a big-endian `i64`.
///
/// # Errors
///
/// Returns an error if fewer than 8 bytes remain.
pub fn read_i64(buf: &mut impl Buf) -> Result<i64> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_i64())
}

/// Read a 16-byte UUID.
///
/// # Errors
///
/// Returns an error if fewer than 16 bytes remain.
pub fn read_uuid(buf: &mut impl Buf) -> Result<uuid::Uuid> {
    ensure_remaining(buf, 16)?;
    let mut bytes = [0u8; 16];
    buf.copy_to_slice(&mut bytes);
    Ok(uuid::Uuid::from_bytes(bytes))
}

/// Write a 16-byte UUID.
pub fn write_uuid(buf: &mut impl BufMut, uuid: uuid::Uuid) {
    buf.put_slice(uuid.as_bytes());
}
