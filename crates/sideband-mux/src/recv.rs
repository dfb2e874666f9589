use std::io::{Read, Write};

use sideband_pktline::PacketReader;
use tracing::debug;

use crate::demux::{Classification, Demultiplexer};
use crate::error::Result;

/// Read sideband frames until flush, copying primary data to `out`.
///
/// Progress and error text reaches the demultiplexer's sink as a side
/// effect. Remote errors are always fatal here. Returns the number of
/// primary bytes copied.
pub fn recv_sideband<R, O, D>(
    demux: &mut Demultiplexer<D>,
    reader: &mut PacketReader<R>,
    out: &mut O,
) -> Result<u64>
where
    R: Read,
    O: Write,
    D: Write,
{
    let mut copied = 0u64;
    loop {
        let packet = reader.read_packet()?;
        match demux.classify_packet(&packet, true) {
            Classification::Flush => {
                out.flush()?;
                debug!(name = %demux.config().name, bytes = copied, "sideband stream flushed");
                return Ok(copied);
            }
            Classification::Primary(data) => {
                out.write_all(data)?;
                copied += data.len() as u64;
            }
            other => {
                other.into_result()?;
            }
        }
    }
}
