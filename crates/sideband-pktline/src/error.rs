/// Errors that can occur while encoding or decoding packet-lines.
#[derive(Debug, thiserror::Error)]
pub enum PktLineError {
    /// The 4-byte length prefix is not hexadecimal.
    #[error("invalid packet length prefix \"{prefix}\"")]
    InvalidLength { prefix: String },

    /// The length prefix names a reserved special packet.
    #[error("reserved packet length {0:04x}")]
    ReservedLength(usize),

    /// The packet exceeds the configured maximum size.
    #[error("packet too large ({size} bytes, max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended on a packet boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended partway through a packet.
    #[error("connection closed mid-packet ({buffered} bytes of a partial packet)")]
    Truncated { buffered: usize },
}

pub type Result<T> = std::result::Result<T, PktLineError>;
