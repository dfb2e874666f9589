use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_delim, encode_flush, encode_packet, encode_response_end};
use crate::error::{PktLineError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete packet-lines to any `Write` stream.
///
/// Each call writes and flushes exactly one packet, so packets never
/// interleave on the wire.
pub struct PacketWriter<W> {
    inner: W,
    buf: BytesMut,
}

impl<W: Write> PacketWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and write one data packet (blocking).
    pub fn write_packet(&mut self, body: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_packet(body, &mut self.buf)?;
        self.write_buffered()
    }

    /// Write a flush packet (`0000`).
    pub fn write_flush(&mut self) -> Result<()> {
        self.buf.clear();
        encode_flush(&mut self.buf);
        self.write_buffered()
    }

    /// Write a delimiter packet (`0001`).
    pub fn write_delim(&mut self) -> Result<()> {
        self.buf.clear();
        encode_delim(&mut self.buf);
        self.write_buffered()
    }

    /// Write a response-end packet (`0002`).
    pub fn write_response_end(&mut self) -> Result<()> {
        self.buf.clear();
        encode_response_end(&mut self.buf);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(PktLineError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PktLineError::Io(err)),
            }
        }
        trace!(size = self.buf.len(), "wrote packet");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PktLineError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
