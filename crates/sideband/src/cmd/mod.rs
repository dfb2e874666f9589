use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use sideband_mux::{Band, DEFAULT_MAX_FRAME_SIZE};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod demux;
pub mod inspect;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Multiplex a payload onto one band as packet-lines on stdout.
    Send(SendArgs),
    /// Demultiplex a packet-line stream from stdin until flush.
    Demux(DemuxArgs),
    /// List each packet of a stream from stdin with its classification.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args),
        Command::Demux(args) => demux::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BandArg {
    Primary,
    Progress,
    Error,
}

impl From<BandArg> for Band {
    fn from(arg: BandArg) -> Self {
        match arg {
            BandArg::Primary => Band::Primary,
            BandArg::Progress => Band::Progress,
            BandArg::Error => Band::Error,
        }
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Band to send on.
    #[arg(long, short = 'b', value_enum, default_value = "primary")]
    pub band: BandArg,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file. Without --data or --file the payload is read from stdin.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Largest frame body, band byte included.
    #[arg(long, env = "SIDEBAND_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Send nothing for an empty payload instead of a band-only frame.
    #[arg(long)]
    pub suppress_empty: bool,
    /// Terminate the message with a flush packet.
    #[arg(long)]
    pub flush: bool,
}

#[derive(Args, Debug)]
pub struct DemuxArgs {
    /// Caller identity used to prefix error diagnostics.
    #[arg(long, env = "SIDEBAND_NAME", default_value = "sideband")]
    pub name: String,
    /// Stop at the first remote error instead of draining to flush.
    #[arg(long)]
    pub die_on_error: bool,
    /// Prefix for each progress line (e.g. "remote: ").
    #[arg(long, value_name = "PREFIX")]
    pub progress_prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Stop after the first flush packet instead of reading to end of input.
    #[arg(long)]
    pub until_flush: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
