//! Packet-line framing for blocking byte streams.
//!
//! Every packet starts with a 4-byte ASCII hexadecimal length that counts the
//! prefix itself plus the body. Lengths `0000`, `0001` and `0002` carry no body
//! and mark flush, delimiter and response-end respectively.
//!
//! This crate is the transport collaborator for `sideband-mux`: it knows how to
//! read and write one packet at a time and nothing about what the bodies mean.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_packet, encode_delim, encode_flush, encode_packet, encode_response_end, Packet,
    PacketConfig, HEADER_SIZE, LARGE_PACKET_DATA_MAX, LARGE_PACKET_MAX,
};
pub use error::{PktLineError, Result};
pub use reader::PacketReader;
pub use writer::PacketWriter;
