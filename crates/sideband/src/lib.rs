//! Sideband multiplexing over packet-lines.
//!
//! One byte-oriented connection, three logical streams: primary data,
//! progress notices and remote errors, each frame tagged with a band byte.
//!
//! # Crate Structure
//!
//! - [`pktline`]: Packet-line framing: the 4-hex length prefix plus flush,
//!   delimiter and response-end markers
//! - [`mux`]: Band classification of inbound frames and bounded chunking of
//!   outbound payloads

/// Re-export packet-line types.
pub mod pktline {
    pub use sideband_pktline::*;
}

/// Re-export sideband types.
pub mod mux {
    pub use sideband_mux::*;
}
