use std::io::{Read, Write};

use sideband_mux::{recv_sideband, Classification, DemuxConfig, Demultiplexer, SidebandError};
use sideband_pktline::PacketReader;
use tracing::{debug, warn};

use crate::cmd::DemuxArgs;
use crate::exit::{
    io_error, pktline_error, sideband_error, CliResult, REMOTE_ERROR, SUCCESS,
};

pub fn run(args: DemuxArgs) -> CliResult<i32> {
    let config = DemuxConfig {
        name: args.name,
        progress_prefix: args.progress_prefix,
    };
    let mut demux = Demultiplexer::with_config(config, std::io::stderr());
    let mut reader = PacketReader::new(std::io::stdin().lock());
    let mut out = std::io::stdout().lock();

    if args.die_on_error {
        let copied = recv_sideband(&mut demux, &mut reader, &mut out)
            .map_err(|err| sideband_error("demux failed", err))?;
        debug!(bytes = copied, "primary data copied");
        return Ok(SUCCESS);
    }

    drain(&mut demux, &mut reader, &mut out)
}

/// Read to flush, reporting remote errors without stopping.
fn drain<R, O, D>(
    demux: &mut Demultiplexer<D>,
    reader: &mut PacketReader<R>,
    out: &mut O,
) -> CliResult<i32>
where
    R: Read,
    O: Write,
    D: Write,
{
    let mut remote_errors = 0usize;
    loop {
        let packet = reader
            .read_packet()
            .map_err(|err| pktline_error("demux failed", err))?;
        match demux.classify_packet(&packet, false) {
            Classification::Flush => break,
            Classification::Primary(data) => out
                .write_all(data)
                .map_err(|err| io_error("failed writing primary data", err))?,
            Classification::Progress => {}
            Classification::RemoteError { .. } => remote_errors += 1,
            Classification::ProtocolError(violation) => {
                return Err(sideband_error(
                    "demux failed",
                    SidebandError::Protocol(violation),
                ))
            }
        }
    }
    out.flush()
        .map_err(|err| io_error("failed writing primary data", err))?;

    if remote_errors > 0 {
        warn!(remote_errors, "remote reported errors before flush");
        return Ok(REMOTE_ERROR);
    }
    Ok(SUCCESS)
}
