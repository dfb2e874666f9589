use std::fmt;

/// How an inbound frame broke the sideband protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// The first byte is not a known band indicator.
    BadBand(u8),
    /// A data packet too short to hold the band indicator.
    MissingBand,
    /// A delimiter or response-end packet where a sideband frame was expected.
    UnexpectedControl(&'static str),
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadBand(byte) => write!(f, "bad band #{byte}"),
            Self::MissingBand => f.write_str("no band designator"),
            Self::UnexpectedControl(kind) => write!(f, "unexpected {kind} packet"),
        }
    }
}

/// Errors surfaced by the sideband layer.
#[derive(Debug, thiserror::Error)]
pub enum SidebandError {
    /// The remote sent a frame this layer cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(ProtocolViolation),

    /// The remote reported a fatal error on the error band.
    #[error("remote error: {0}")]
    Remote(String),

    /// The packet-line collaborator failed; passed through unchanged.
    #[error(transparent)]
    Transport(#[from] sideband_pktline::PktLineError),

    /// Writing primary data to the caller's output failed.
    #[error("sideband output error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame must hold the band byte plus at least one payload byte and
    /// fit in one packet-line body.
    #[error("invalid max frame size {0} (must be between 2 and 65516)")]
    InvalidMaxFrameSize(usize),
}

pub type Result<T> = std::result::Result<T, SidebandError>;
