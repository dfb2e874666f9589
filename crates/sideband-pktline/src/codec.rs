use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PktLineError, Result};

/// Length prefix: 4 ASCII hex digits.
pub const HEADER_SIZE: usize = 4;

/// Largest packet on the wire, prefix included.
pub const LARGE_PACKET_MAX: usize = 65520;

/// Largest body a single packet can carry.
pub const LARGE_PACKET_DATA_MAX: usize = LARGE_PACKET_MAX - HEADER_SIZE;

const FLUSH_LEN: usize = 0;
const DELIM_LEN: usize = 1;
const RESPONSE_END_LEN: usize = 2;
const RESERVED_LEN: usize = 3;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// One decoded packet-line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// `0000`: end of a logical message.
    Flush,
    /// `0001`: section delimiter.
    Delim,
    /// `0002`: end of a stateless response.
    ResponseEnd,
    /// Any packet carrying a body (possibly empty, for `0004`).
    Data(Bytes),
}

impl Packet {
    /// Create a data packet.
    pub fn data(body: impl Into<Bytes>) -> Self {
        Self::Data(body.into())
    }

    /// The body of a data packet, `None` for special packets.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::Data(body) => Some(body.as_ref()),
            _ => None,
        }
    }

    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Short name used in diagnostics and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Flush => "flush",
            Self::Delim => "delim",
            Self::ResponseEnd => "response-end",
            Self::Data(_) => "data",
        }
    }

    /// The total wire size of this packet (prefix + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body().map_or(0, <[u8]>::len)
    }
}

/// Encode a data packet into the wire format.
///
/// ```text
/// ┌──────────────────┬──────────────────────────┐
/// │ Length (4B hex)  │ Body (Length - 4 bytes)  │
/// │ "0009"           │ "hello"                  │
/// └──────────────────┴──────────────────────────┘
/// ```
pub fn encode_packet(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > LARGE_PACKET_DATA_MAX {
        return Err(PktLineError::PacketTooLarge {
            size: body.len() + HEADER_SIZE,
            max: LARGE_PACKET_MAX,
        });
    }
    dst.reserve(HEADER_SIZE + body.len());
    put_length(dst, HEADER_SIZE + body.len());
    dst.put_slice(body);
    Ok(())
}

/// Encode a flush packet (`0000`).
pub fn encode_flush(dst: &mut BytesMut) {
    put_length(dst, FLUSH_LEN);
}

/// Encode a delimiter packet (`0001`).
pub fn encode_delim(dst: &mut BytesMut) {
    put_length(dst, DELIM_LEN);
}

/// Encode a response-end packet (`0002`).
pub fn encode_response_end(dst: &mut BytesMut) {
    put_length(dst, RESPONSE_END_LEN);
}

/// Decode a packet from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete packet yet.
/// On success, consumes the packet bytes from the buffer.
pub fn decode_packet(src: &mut BytesMut, max_packet_size: usize) -> Result<Option<Packet>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let len = parse_length(&src[..HEADER_SIZE]).ok_or_else(|| PktLineError::InvalidLength {
        prefix: src[..HEADER_SIZE].escape_ascii().to_string(),
    })?;

    let special = match len {
        FLUSH_LEN => Some(Packet::Flush),
        DELIM_LEN => Some(Packet::Delim),
        RESPONSE_END_LEN => Some(Packet::ResponseEnd),
        RESERVED_LEN => return Err(PktLineError::ReservedLength(len)),
        _ => None,
    };
    if let Some(packet) = special {
        src.advance(HEADER_SIZE);
        return Ok(Some(packet));
    }

    if len > max_packet_size {
        return Err(PktLineError::PacketTooLarge {
            size: len,
            max: max_packet_size,
        });
    }

    if src.len() < len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let body = src.split_to(len - HEADER_SIZE).freeze();

    Ok(Some(Packet::Data(body)))
}

fn put_length(dst: &mut BytesMut, len: usize) {
    debug_assert!(len <= 0xffff);
    dst.put_slice(&[
        HEX_DIGITS[(len >> 12) & 0xf],
        HEX_DIGITS[(len >> 8) & 0xf],
        HEX_DIGITS[(len >> 4) & 0xf],
        HEX_DIGITS[len & 0xf],
    ]);
}

fn parse_length(prefix: &[u8]) -> Option<usize> {
    prefix.iter().try_fold(0usize, |acc, &byte| {
        let digit = char::from(byte).to_digit(16)?;
        Some((acc << 4) | digit as usize)
    })
}

/// Configuration for the packet codec.
#[derive(Debug, Clone)]
pub struct PacketConfig {
    /// Maximum packet size in bytes, prefix included. Default: 65520.
    pub max_packet_size: usize,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            max_packet_size: LARGE_PACKET_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_lowercase_hex_length() {
        let mut buf = BytesMut::new();
        encode_packet(b"hello\n", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"000ahello\n");

        let mut buf = BytesMut::new();
        encode_packet(&[0u8; 0xfb], &mut buf).unwrap();
        assert_eq!(&buf[..HEADER_SIZE], b"00ff");
    }

    #[test]
    fn encode_decode_data_packet() {
        let mut buf = BytesMut::new();
        encode_packet(b"\x01pack data", &mut buf).unwrap();

        let packet = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap().unwrap();
        assert_eq!(packet.body(), Some(&b"\x01pack data"[..]));
        assert!(buf.is_empty());
    }

    #[test]
    fn special_packets() {
        let mut buf = BytesMut::new();
        encode_flush(&mut buf);
        encode_delim(&mut buf);
        encode_response_end(&mut buf);
        assert_eq!(buf.as_ref(), b"000000010002");

        let decoded: Vec<Packet> = std::iter::from_fn(|| {
            decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap()
        })
        .collect();
        assert_eq!(
            decoded,
            vec![Packet::Flush, Packet::Delim, Packet::ResponseEnd]
        );
    }

    #[test]
    fn empty_data_packet_is_not_flush() {
        let mut buf = BytesMut::from(&b"0004"[..]);
        let packet = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap().unwrap();
        assert_eq!(packet, Packet::Data(Bytes::new()));
        assert!(!packet.is_flush());
    }

    #[test]
    fn accepts_uppercase_hex() {
        let mut buf = BytesMut::from(&b"000Ahello\n"[..]);
        let packet = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap().unwrap();
        assert_eq!(packet.body(), Some(&b"hello\n"[..]));
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&b"00"[..]);
        assert!(decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn decode_incomplete_body() {
        let mut buf = BytesMut::new();
        encode_packet(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap().is_none());
    }

    #[test]
    fn decode_invalid_prefix() {
        let mut buf = BytesMut::from(&b"zz01abc"[..]);
        let err = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap_err();
        assert!(matches!(err, PktLineError::InvalidLength { ref prefix } if prefix == "zz01"));
    }

    #[test]
    fn decode_reserved_length() {
        let mut buf = BytesMut::from(&b"0003"[..]);
        let err = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap_err();
        assert!(matches!(err, PktLineError::ReservedLength(3)));
    }

    #[test]
    fn decode_rejects_oversized_before_body_arrives() {
        let mut buf = BytesMut::from(&b"ffff"[..]);
        let err = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap_err();
        assert!(matches!(
            err,
            PktLineError::PacketTooLarge {
                size: 0xffff,
                max: LARGE_PACKET_MAX
            }
        ));
    }

    #[test]
    fn encode_rejects_oversized_body() {
        let body = vec![0u8; LARGE_PACKET_DATA_MAX + 1];
        let mut buf = BytesMut::new();
        let err = encode_packet(&body, &mut buf).unwrap_err();
        assert!(matches!(err, PktLineError::PacketTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn largest_body_fits() {
        let body = vec![b'x'; LARGE_PACKET_DATA_MAX];
        let mut buf = BytesMut::new();
        encode_packet(&body, &mut buf).unwrap();
        assert_eq!(&buf[..HEADER_SIZE], b"fff0");

        let packet = decode_packet(&mut buf, LARGE_PACKET_MAX).unwrap().unwrap();
        assert_eq!(packet.wire_size(), LARGE_PACKET_MAX);
    }
}
