use std::io::Write;

use bytes::{BufMut, BytesMut};
use sideband_pktline::{PacketWriter, HEADER_SIZE, LARGE_PACKET_DATA_MAX};
use tracing::{debug, trace};

use crate::band::Band;
use crate::error::{Result, SidebandError};

/// Default frame body limit: the largest packet-line body.
pub const DEFAULT_MAX_FRAME_SIZE: usize = LARGE_PACKET_DATA_MAX;

/// Smallest usable frame: band byte plus one payload byte.
const MIN_FRAME_SIZE: usize = 2;

/// Destination for outbound frame bodies.
///
/// One call writes one whole frame; implementations must not interleave
/// frames. Errors are returned as-is and never retried by the multiplexer.
pub trait FrameSink {
    fn write_frame(&mut self, body: &[u8]) -> sideband_pktline::Result<()>;
}

impl<W: Write> FrameSink for PacketWriter<W> {
    fn write_frame(&mut self, body: &[u8]) -> sideband_pktline::Result<()> {
        self.write_packet(body)
    }
}

/// Collects frame bodies in memory.
impl FrameSink for Vec<Vec<u8>> {
    fn write_frame(&mut self, body: &[u8]) -> sideband_pktline::Result<()> {
        self.push(body.to_vec());
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn write_frame(&mut self, body: &[u8]) -> sideband_pktline::Result<()> {
        (**self).write_frame(body)
    }
}

/// What to send for a zero-length payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPayload {
    /// Emit one frame holding only the band byte.
    #[default]
    Announce,
    /// Emit nothing.
    Suppress,
}

/// Splits outbound payloads into band-tagged frames.
///
/// Every frame is `band byte + chunk` and never longer than
/// `max_frame_size`, so each carries at most `max_frame_size - 1` payload
/// bytes.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    max_frame_size: usize,
    empty_payload: EmptyPayload,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            empty_payload: EmptyPayload::default(),
        }
    }
}

impl Multiplexer {
    /// Create a multiplexer bounded by `max_frame_size` (band byte included).
    ///
    /// The limit must leave room for one payload byte and must fit in a
    /// single packet-line body.
    pub fn new(max_frame_size: usize) -> Result<Self> {
        if !(MIN_FRAME_SIZE..=DEFAULT_MAX_FRAME_SIZE).contains(&max_frame_size) {
            return Err(SidebandError::InvalidMaxFrameSize(max_frame_size));
        }
        Ok(Self {
            max_frame_size,
            empty_payload: EmptyPayload::default(),
        })
    }

    /// Create a multiplexer from a total packet-line size, length prefix
    /// included, as negotiated by the transport.
    pub fn for_packet_max(packet_max: usize) -> Result<Self> {
        Self::new(packet_max.saturating_sub(HEADER_SIZE))
    }

    pub fn with_empty_payload(mut self, policy: EmptyPayload) -> Self {
        self.empty_payload = policy;
        self
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn empty_payload(&self) -> EmptyPayload {
        self.empty_payload
    }

    /// Payload bytes carried per frame.
    pub fn max_chunk(&self) -> usize {
        self.max_frame_size - 1
    }

    /// Number of frames [`send`](Self::send) emits for a payload of `len` bytes.
    pub fn frame_count(&self, len: usize) -> usize {
        match (len, self.empty_payload) {
            (0, EmptyPayload::Announce) => 1,
            (0, EmptyPayload::Suppress) => 0,
            (len, _) => len.div_ceil(self.max_chunk()),
        }
    }

    /// Send `payload` on `band` as one logical message.
    ///
    /// Frames go out in order through `sink`. The first write failure is
    /// returned immediately; frames already written stay written.
    /// Returns the number of frames written.
    pub fn send<S: FrameSink + ?Sized>(
        &self,
        sink: &mut S,
        band: Band,
        payload: &[u8],
    ) -> Result<usize> {
        if payload.is_empty() {
            return match self.empty_payload {
                EmptyPayload::Suppress => {
                    trace!(%band, "suppressed empty sideband message");
                    Ok(0)
                }
                EmptyPayload::Announce => {
                    sink.write_frame(&[band.as_u8()])?;
                    trace!(%band, "sent empty sideband announcement");
                    Ok(1)
                }
            };
        }

        let mut frame = BytesMut::with_capacity(self.max_frame_size.min(payload.len() + 1));
        let mut frames = 0usize;
        for chunk in payload.chunks(self.max_chunk()) {
            frame.clear();
            frame.put_u8(band.as_u8());
            frame.put_slice(chunk);
            sink.write_frame(&frame)?;
            frames += 1;
        }

        debug!(%band, len = payload.len(), frames, "sent sideband message");
        Ok(frames)
    }
}

/// Send `payload` on `band` through `sink` in frames of at most
/// `max_frame_size` bytes, announcing empty payloads with a band-only frame.
pub fn send_sideband<S: FrameSink + ?Sized>(
    sink: &mut S,
    band: Band,
    payload: &[u8],
    max_frame_size: usize,
) -> Result<usize> {
    Multiplexer::new(max_frame_size)?.send(sink, band, payload)
}
