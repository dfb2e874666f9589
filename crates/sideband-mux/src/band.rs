//! Band indicators.
//!
//! The first byte of every non-flush sideband frame. Any value outside
//! `1..=3` is a protocol error on the receiving side.

use std::fmt;

/// A logical sub-channel carried in the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Band {
    /// Application payload, opaque to this layer.
    Primary = 1,
    /// Human-readable, non-fatal status text.
    Progress = 2,
    /// Fatal condition reported by the remote.
    Error = 3,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Primary, Band::Progress, Band::Error];

    /// The on-wire indicator byte.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable name for the band.
    pub const fn name(self) -> &'static str {
        match self {
            Band::Primary => "PRIMARY",
            Band::Progress => "PROGRESS",
            Band::Error => "ERROR",
        }
    }
}

impl TryFrom<u8> for Band {
    /// The unrecognized indicator byte.
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        match byte {
            1 => Ok(Band::Primary),
            2 => Ok(Band::Progress),
            3 => Ok(Band::Error),
            other => Err(other),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
