use std::io::Write;

use sideband_pktline::Packet;
use tracing::{trace, warn};

use crate::band::Band;
use crate::error::{ProtocolViolation, Result, SidebandError};

/// Configuration for a [`Demultiplexer`].
#[derive(Debug, Clone, Default)]
pub struct DemuxConfig {
    /// Caller identity prefixed to error diagnostics (e.g. `fetch-pack`).
    /// Purely cosmetic; an empty name drops the prefix.
    pub name: String,
    /// Prefix for every progress line (e.g. `remote: `). `None` writes
    /// progress bytes exactly as received.
    pub progress_prefix: Option<String>,
}

impl DemuxConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            progress_prefix: None,
        }
    }

    pub fn with_progress_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.progress_prefix = Some(prefix.into());
        self
    }
}

/// What one inbound frame turned out to be.
///
/// Exactly one classification is produced per frame. Only `Primary` hands
/// payload bytes back; progress and error text has already gone to the
/// diagnostic sink by the time this value is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// Transport-level flush: end of the logical message.
    Flush,
    /// Primary-band payload with the band byte stripped.
    Primary(&'a [u8]),
    /// Progress text, already written to the sink.
    Progress,
    /// The remote reported a fatal error. `fatal` mirrors the die-on-error
    /// flag the frame was classified with; `message` is kept only so the
    /// caller can build an error value.
    RemoteError { message: &'a [u8], fatal: bool },
    /// The frame is malformed; the session cannot continue.
    ProtocolError(ProtocolViolation),
}

impl<'a> Classification<'a> {
    /// Whether the caller must stop reading this stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RemoteError { fatal: true, .. } | Self::ProtocolError(_)
        )
    }

    /// The band this frame was tagged with, if it had a valid one.
    pub fn band(&self) -> Option<Band> {
        match self {
            Self::Primary(_) => Some(Band::Primary),
            Self::Progress => Some(Band::Progress),
            Self::RemoteError { .. } => Some(Band::Error),
            Self::Flush | Self::ProtocolError(_) => None,
        }
    }

    /// Short label for logs and listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flush => "FLUSH",
            Self::Primary(_) => "PRIMARY",
            Self::Progress => "PROGRESS",
            Self::RemoteError { .. } => "REMOTE_ERROR",
            Self::ProtocolError(_) => "PROTOCOL_ERROR",
        }
    }

    /// Turn terminal classifications into errors.
    ///
    /// A remote error classified without die-on-error stays `Ok`, leaving
    /// the decision to the caller.
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::ProtocolError(violation) => Err(SidebandError::Protocol(violation)),
            Self::RemoteError {
                message,
                fatal: true,
            } => Err(SidebandError::Remote(
                String::from_utf8_lossy(message)
                    .trim_end_matches('\n')
                    .to_string(),
            )),
            other => Ok(other),
        }
    }
}

/// Classifies inbound sideband frames and reports side-band text.
///
/// Holds no per-connection state besides its configuration and the
/// diagnostic sink, so one instance serves a whole stream.
pub struct Demultiplexer<D> {
    config: DemuxConfig,
    sink: D,
}

impl<D: Write> Demultiplexer<D> {
    /// Create a demultiplexer that prefixes diagnostics with `name`.
    pub fn new(name: impl Into<String>, sink: D) -> Self {
        Self::with_config(DemuxConfig::new(name), sink)
    }

    pub fn with_config(config: DemuxConfig, sink: D) -> Self {
        Self { config, sink }
    }

    /// Classify one frame body.
    ///
    /// An empty body is a flush. Otherwise the first byte selects the band:
    /// primary payload is returned, progress is written to the sink as-is,
    /// and error-band text is written after `"<name>: remote error: "`.
    pub fn classify<'a>(
        &mut self,
        body: &'a [u8],
        die_on_remote_error: bool,
    ) -> Classification<'a> {
        let Some((&indicator, payload)) = body.split_first() else {
            trace!(name = %self.config.name, "flush");
            return Classification::Flush;
        };

        let classification = match Band::try_from(indicator) {
            Ok(Band::Primary) => Classification::Primary(payload),
            Ok(Band::Progress) => {
                self.report_progress(payload);
                Classification::Progress
            }
            Ok(Band::Error) => {
                let mut text = self.name_prefix().into_bytes();
                text.extend_from_slice(b"remote error: ");
                text.extend_from_slice(payload);
                self.emit(&text);
                Classification::RemoteError {
                    message: payload,
                    fatal: die_on_remote_error,
                }
            }
            Err(byte) => return self.protocol_error(ProtocolViolation::BadBand(byte)),
        };

        trace!(
            name = %self.config.name,
            class = classification.label(),
            len = payload.len(),
            "classified frame"
        );
        classification
    }

    /// Classify a packet straight from the packet-line reader.
    ///
    /// Unlike [`classify`](Self::classify), this can tell a flush apart from
    /// a `0004` data packet whose body is too short for a band byte.
    pub fn classify_packet<'a>(
        &mut self,
        packet: &'a Packet,
        die_on_remote_error: bool,
    ) -> Classification<'a> {
        match packet {
            Packet::Flush => Classification::Flush,
            Packet::Data(body) if body.is_empty() => {
                self.protocol_error(ProtocolViolation::MissingBand)
            }
            Packet::Data(body) => self.classify(body, die_on_remote_error),
            other => self.protocol_error(ProtocolViolation::UnexpectedControl(other.kind_name())),
        }
    }

    fn protocol_error<'a>(&mut self, violation: ProtocolViolation) -> Classification<'a> {
        let text = format!("{}protocol error: {violation}\n", self.name_prefix());
        self.emit(text.as_bytes());
        trace!(name = %self.config.name, %violation, "protocol error");
        Classification::ProtocolError(violation)
    }

    fn report_progress(&mut self, payload: &[u8]) {
        match &self.config.progress_prefix {
            None => self.emit(payload),
            Some(prefix) => {
                let text = prefix_lines(prefix.as_bytes(), payload);
                self.emit(&text);
            }
        }
    }

    fn name_prefix(&self) -> String {
        if self.config.name.is_empty() {
            String::new()
        } else {
            format!("{}: ", self.config.name)
        }
    }

    /// Sink failures never change the classification.
    fn emit(&mut self, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        if let Err(err) = self.sink.write_all(text).and_then(|()| self.sink.flush()) {
            warn!(name = %self.config.name, error = %err, "failed to write sideband diagnostic");
        }
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Borrow the diagnostic sink.
    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Mutably borrow the diagnostic sink.
    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }

    /// Consume the demultiplexer and return the diagnostic sink.
    pub fn into_sink(self) -> D {
        self.sink
    }
}

/// Prefix every line of `payload`. Lines end at `\n`, `\r` or `\r\n`, and
/// the terminators are kept.
fn prefix_lines(prefix: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + prefix.len());
    let mut rest = payload;
    while !rest.is_empty() {
        let end = match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) if rest[i] == b'\r' && rest.get(i + 1) == Some(&b'\n') => i + 2,
            Some(i) => i + 1,
            None => rest.len(),
        };
        out.extend_from_slice(prefix);
        out.extend_from_slice(&rest[..end]);
        rest = &rest[end..];
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use bytes::Bytes;

    use super::*;

    fn demux(name: &str) -> Demultiplexer<Vec<u8>> {
        Demultiplexer::new(name, Vec::<u8>::new())
    }

    #[test]
    fn empty_body_is_flush_regardless_of_flag() {
        let mut d = demux("fetch-pack");
        assert_eq!(d.classify(b"", false), Classification::Flush);
        assert_eq!(d.classify(b"", true), Classification::Flush);
        assert!(d.sink().is_empty());
    }

    #[test]
    fn primary_returns_payload_without_output() {
        let mut d = demux("fetch-pack");
        let frame = b"\x01PACK\x00\x00\x00\x02";
        assert_eq!(d.classify(frame, true), Classification::Primary(&frame[1..]));
        assert!(d.sink().is_empty());
    }

    #[test]
    fn progress_is_written_byte_for_byte() {
        let mut d = demux("fetch-pack");
        let frame = b"\x02Counting objects:  50% (1/2)\rCounting objects: 100% (2/2)\n\x1b[K";
        assert_eq!(d.classify(frame, true), Classification::Progress);
        assert_eq!(d.sink().as_slice(), &frame[1..]);
    }

    #[test]
    fn remote_error_is_prefixed_with_name() {
        let mut d = demux("upload-pack");
        let class = d.classify(b"\x03bad thing happened", true);

        assert_eq!(
            class,
            Classification::RemoteError {
                message: b"bad thing happened",
                fatal: true
            }
        );
        assert!(class.is_terminal());
        assert_eq!(
            String::from_utf8_lossy(d.sink()),
            "upload-pack: remote error: bad thing happened"
        );
    }

    #[test]
    fn remote_error_without_die_is_still_reported() {
        let mut d = demux("fetch-pack");
        let class = d.classify(b"\x03disk full\n", false);

        assert_eq!(class.band(), Some(Band::Error));
        assert!(!class.is_terminal());
        assert!(class.into_result().is_ok());
        assert!(String::from_utf8_lossy(d.sink()).contains("remote error: disk full\n"));
    }

    #[test]
    fn unknown_band_is_protocol_error() {
        for byte in [0u8, 4, 0x7f, 0xff] {
            let mut d = demux("fetch-pack");
            let frame = [byte, b'x'];
            let class = d.classify(&frame, false);
            assert_eq!(
                class,
                Classification::ProtocolError(ProtocolViolation::BadBand(byte))
            );
            assert_eq!(
                String::from_utf8_lossy(d.sink()),
                format!("fetch-pack: protocol error: bad band #{byte}\n")
            );
        }
    }

    #[test]
    fn indicator_only_frames_are_valid() {
        let mut d = demux("fetch-pack");
        assert_eq!(d.classify(b"\x01", false), Classification::Primary(b""));
        assert_eq!(d.classify(b"\x02", false), Classification::Progress);
        assert!(d.sink().is_empty());

        let class = d.classify(b"\x03", false);
        assert_eq!(
            class,
            Classification::RemoteError {
                message: b"",
                fatal: false
            }
        );
        assert_eq!(d.sink().as_slice(), b"fetch-pack: remote error: ");
    }

    #[test]
    fn empty_name_drops_prefix() {
        let mut d = demux("");
        d.classify(b"\x03oops", false);
        assert_eq!(d.into_sink(), b"remote error: oops");
    }

    #[test]
    fn classify_packet_distinguishes_flush_from_short_packet() {
        let mut d = demux("fetch-pack");
        assert_eq!(
            d.classify_packet(&Packet::Flush, false),
            Classification::Flush
        );

        let empty = Packet::Data(Bytes::new());
        assert_eq!(
            d.classify_packet(&empty, false),
            Classification::ProtocolError(ProtocolViolation::MissingBand)
        );
        assert_eq!(
            String::from_utf8_lossy(d.sink()),
            "fetch-pack: protocol error: no band designator\n"
        );
    }

    #[test]
    fn classify_packet_rejects_control_packets() {
        let mut d = demux("fetch-pack");
        let class = d.classify_packet(&Packet::Delim, false);
        assert_eq!(
            class,
            Classification::ProtocolError(ProtocolViolation::UnexpectedControl("delim"))
        );
        assert!(String::from_utf8_lossy(d.sink()).ends_with("unexpected delim packet\n"));

        let packet = Packet::data(&b"\x01data"[..]);
        assert_eq!(
            d.classify_packet(&packet, false),
            Classification::Primary(b"data")
        );
    }

    #[test]
    fn into_result_maps_terminal_classes() {
        let err = Classification::ProtocolError(ProtocolViolation::BadBand(9))
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "protocol error: bad band #9");

        let err = Classification::RemoteError {
            message: b"access denied\n",
            fatal: true,
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, SidebandError::Remote(ref msg) if msg == "access denied"));

        assert_eq!(
            Classification::Primary(b"x").into_result().unwrap(),
            Classification::Primary(b"x")
        );
    }

    #[test]
    fn progress_prefix_applies_per_line() {
        let config = DemuxConfig::new("fetch-pack").with_progress_prefix("remote: ");
        let mut d = Demultiplexer::with_config(config, Vec::<u8>::new());

        d.classify(b"\x02Compressing: 10%\rCompressing: 100%\r\ndone.\npartial", false);
        assert_eq!(
            String::from_utf8_lossy(d.sink()),
            "remote: Compressing: 10%\rremote: Compressing: 100%\r\nremote: done.\nremote: partial"
        );
    }

    #[test]
    fn progress_prefix_skips_empty_payload() {
        let config = DemuxConfig::new("fetch-pack").with_progress_prefix("remote: ");
        let mut d = Demultiplexer::with_config(config, Vec::<u8>::new());
        assert_eq!(d.classify(b"\x02", false), Classification::Progress);
        assert!(d.sink().is_empty());
    }

    #[test]
    fn sink_failure_does_not_change_classification() {
        let mut d = Demultiplexer::new("fetch-pack", FailingSink);
        assert_eq!(d.classify(b"\x02hello", false), Classification::Progress);
        assert!(matches!(
            d.classify(b"\x09", false),
            Classification::ProtocolError(ProtocolViolation::BadBand(9))
        ));
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
