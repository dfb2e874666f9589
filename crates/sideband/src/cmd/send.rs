use std::fs;
use std::io::{Read, Write};

use sideband_mux::{Band, EmptyPayload, Multiplexer, SidebandError};
use sideband_pktline::{PacketWriter, PktLineError};
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{io_error, pktline_error, sideband_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let mux = multiplexer(args.max_frame_size, args.suppress_empty)?;
    let payload = resolve_payload(&args)?;
    let mut writer = PacketWriter::new(std::io::stdout().lock());
    let frames = send_message(&mux, &mut writer, args.band.into(), &payload, args.flush)?;

    debug!(band = ?args.band, bytes = payload.len(), frames, "send complete");
    Ok(SUCCESS)
}

/// Frame-size problems are the caller's configuration, never the peer's.
fn multiplexer(max_frame_size: usize, suppress_empty: bool) -> CliResult<Multiplexer> {
    let policy = if suppress_empty {
        EmptyPayload::Suppress
    } else {
        EmptyPayload::Announce
    };
    Multiplexer::new(max_frame_size)
        .map(|mux| mux.with_empty_payload(policy))
        .map_err(|err| sideband_error("invalid --max-frame-size", err))
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let mut payload = Vec::new();
    std::io::stdin()
        .lock()
        .read_to_end(&mut payload)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(payload)
}

fn send_message<W: Write>(
    mux: &Multiplexer,
    writer: &mut PacketWriter<W>,
    band: Band,
    payload: &[u8],
    flush: bool,
) -> CliResult<usize> {
    let frames = mux.send(writer, band, payload).map_err(|err| match err {
        // Outbound frames are sized locally; an oversized one is our bug.
        SidebandError::Transport(PktLineError::PacketTooLarge { .. }) => {
            CliError::new(INTERNAL, format!("send failed: {err}"))
        }
        err => sideband_error("send failed", err),
    })?;
    if flush {
        writer
            .write_flush()
            .map_err(|err| pktline_error("send failed", err))?;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn wire(mux: &Multiplexer, band: Band, payload: &[u8], flush: bool) -> Vec<u8> {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        send_message(mux, &mut writer, band, payload, flush).expect("send should succeed");
        writer.into_inner().into_inner()
    }

    #[test]
    fn chunks_and_flushes() {
        let mux = Multiplexer::new(5).unwrap();
        assert_eq!(
            wire(&mux, Band::Progress, b"hello world", true),
            b"0009\x02hell0009\x02o wo0008\x02rld0000"
        );
    }

    #[test]
    fn empty_payload_policies() {
        let announce = Multiplexer::new(16).unwrap();
        assert_eq!(wire(&announce, Band::Error, b"", false), b"0005\x03");

        let suppress = announce.with_empty_payload(EmptyPayload::Suppress);
        assert_eq!(wire(&suppress, Band::Error, b"", true), b"0000");
    }

    #[test]
    fn frame_size_beyond_packet_line_is_usage_error() {
        for max in [sideband_pktline::LARGE_PACKET_DATA_MAX + 1, 70_000] {
            let err = multiplexer(max, false).unwrap_err();
            assert_eq!(err.code, crate::exit::USAGE);
            assert!(err.message.starts_with("invalid --max-frame-size"));
        }
    }

    #[test]
    fn frame_size_bounds_are_inclusive() {
        let largest = multiplexer(sideband_pktline::LARGE_PACKET_DATA_MAX, true).unwrap();
        assert_eq!(largest.empty_payload(), EmptyPayload::Suppress);

        let payload = vec![0u8; sideband_pktline::LARGE_PACKET_DATA_MAX];
        let bytes = wire(&largest, Band::Primary, &payload, false);
        assert_eq!(bytes.len(), 2 * sideband_pktline::HEADER_SIZE + payload.len() + 2);

        assert_eq!(multiplexer(2, false).unwrap().max_frame_size(), 2);
        assert_eq!(multiplexer(1, false).unwrap_err().code, crate::exit::USAGE);
    }
}
