use std::fmt;
use std::io;

use sideband_mux::SidebandError;
use sideband_pktline::PktLineError;

// Stable exit codes; scripts wrapping `sideband demux` branch on these.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const REMOTE_ERROR: i32 = 40;
pub const PERMISSION_DENIED: i32 = 50;
pub const PROTOCOL_ERROR: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn pktline_error(context: &str, err: PktLineError) -> CliError {
    match err {
        PktLineError::Io(source) => io_error(context, source),
        PktLineError::ConnectionClosed | PktLineError::Truncated { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        PktLineError::InvalidLength { .. }
        | PktLineError::ReservedLength(_)
        | PktLineError::PacketTooLarge { .. } => {
            CliError::new(PROTOCOL_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn sideband_error(context: &str, err: SidebandError) -> CliError {
    match err {
        SidebandError::Transport(err) => pktline_error(context, err),
        SidebandError::Io(err) => io_error(context, err),
        SidebandError::Remote(_) => CliError::new(REMOTE_ERROR, format!("{context}: {err}")),
        SidebandError::Protocol(_) => CliError::new(PROTOCOL_ERROR, format!("{context}: {err}")),
        SidebandError::InvalidMaxFrameSize(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}
