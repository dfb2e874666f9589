use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_packet, Packet, PacketConfig};
use crate::error::{PktLineError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete packet-lines from any `Read` stream.
///
/// Partial reads are buffered internally; callers always get complete packets.
pub struct PacketReader<R> {
    inner: R,
    buf: BytesMut,
    config: PacketConfig,
}

impl<R: Read> PacketReader<R> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: R, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// EOF between packets is `ConnectionClosed`; EOF inside a packet is
    /// `Truncated`.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = decode_packet(&mut self.buf, self.config.max_packet_size)? {
                trace!(kind = packet.kind_name(), size = packet.wire_size(), "read packet");
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PktLineError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(PktLineError::ConnectionClosed);
                }
                return Err(PktLineError::Truncated {
                    buffered: self.buf.len(),
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Bytes already buffered past the last returned packet are discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Update maximum packet size for subsequent decoding.
    pub fn set_max_packet_size(&mut self, max_packet_size: usize) {
        self.config.max_packet_size = max_packet_size;
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> &PacketConfig {
        &self.config
    }
}
