//! Relay example: a server thread multiplexes progress and a payload onto one
//! TCP connection, the client demultiplexes them until flush.
//!
//! Run with:
//!   cargo run --example relay

use std::net::{TcpListener, TcpStream};
use std::thread;

use sideband::mux::{recv_sideband, send_sideband, Band, DemuxConfig, Demultiplexer, Multiplexer};
use sideband::pktline::{PacketReader, PacketWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let server = thread::spawn(
        move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let (stream, peer) = listener.accept()?;
            eprintln!("[server] client connected from {peer}");

            let mut writer = PacketWriter::new(stream);
            let mux = Multiplexer::new(32)?;
            for pct in [25, 50, 75, 100] {
                let line = format!("Counting objects: {pct:3}%\r");
                mux.send(&mut writer, Band::Progress, line.as_bytes())?;
            }
            send_sideband(&mut writer, Band::Progress, b"\n", 32)?;

            let payload = b"The quick brown fox jumps over the lazy dog. ".repeat(4);
            let frames = mux.send(&mut writer, Band::Primary, &payload)?;
            eprintln!("[server] sent {} bytes in {frames} frames", payload.len());
            writer.write_flush()?;
            Ok(())
        },
    );

    let stream = TcpStream::connect(addr)?;
    let mut reader = PacketReader::new(stream);
    let config = DemuxConfig::new("relay").with_progress_prefix("remote: ");
    let mut demux = Demultiplexer::with_config(config, std::io::stderr());
    let mut primary = Vec::new();

    let copied = recv_sideband(&mut demux, &mut reader, &mut primary)?;
    eprintln!("[client] received {copied} bytes of primary data");
    println!("{}", String::from_utf8_lossy(&primary));

    server
        .join()
        .map_err(|_| "server thread panicked")?
        .map_err(|err| err.to_string())?;
    Ok(())
}
