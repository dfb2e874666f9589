use std::io::Read;

use sideband_mux::Demultiplexer;
use sideband_pktline::{PacketReader, PktLineError};
use tracing::debug;

use crate::cmd::InspectArgs;
use crate::exit::{pktline_error, CliResult, SUCCESS};
use crate::output::{print_records, OutputFormat, PacketRecord};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let mut reader = PacketReader::new(std::io::stdin().lock());
    let records = collect_records(&mut reader, args.until_flush)?;
    print_records(&records, format);
    Ok(SUCCESS)
}

/// Classify every packet without surfacing diagnostics.
fn collect_records<R: Read>(
    reader: &mut PacketReader<R>,
    until_flush: bool,
) -> CliResult<Vec<PacketRecord>> {
    let mut demux = Demultiplexer::new("", std::io::sink());
    let mut records = Vec::new();
    loop {
        let packet = match reader.read_packet() {
            Ok(packet) => packet,
            Err(PktLineError::ConnectionClosed) => {
                debug!(packets = records.len(), "end of input");
                break;
            }
            Err(err) => return Err(pktline_error("inspect failed", err)),
        };
        let class = demux.classify_packet(&packet, false);
        records.push(PacketRecord::new(records.len(), &packet, &class));
        if until_flush && packet.is_flush() {
            break;
        }
    }
    Ok(records)
}
