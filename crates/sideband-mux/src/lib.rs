//! Sideband multiplexing over packet-lines.
//!
//! A sideband frame is a packet-line body whose first byte names a band:
//! - `1` primary data, handed back to the caller untouched
//! - `2` progress text, written to a diagnostic sink
//! - `3` a fatal error reported by the remote, written to the sink
//!
//! [`Demultiplexer`] classifies one inbound frame at a time,
//! [`Multiplexer`] splits an outbound payload into bounded frames, and
//! [`recv_sideband`] drives the former over a [`PacketReader`] until flush.
//!
//! [`PacketReader`]: sideband_pktline::PacketReader

pub mod band;
pub mod demux;
pub mod error;
pub mod mux;
pub mod recv;

pub use band::Band;
pub use demux::{Classification, DemuxConfig, Demultiplexer};
pub use error::{ProtocolViolation, Result, SidebandError};
pub use mux::{send_sideband, EmptyPayload, FrameSink, Multiplexer, DEFAULT_MAX_FRAME_SIZE};
pub use recv::recv_sideband;
