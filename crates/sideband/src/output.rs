use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sideband_mux::Classification;
use sideband_pktline::Packet;

const PREVIEW_CHARS: usize = 60;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One inbound packet and what the demultiplexer made of it.
#[derive(Debug, Serialize)]
pub struct PacketRecord {
    pub index: usize,
    pub packet: &'static str,
    pub wire_size: usize,
    pub class: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<&'static str>,
    pub payload_size: usize,
    pub payload: String,
}

impl PacketRecord {
    pub fn new(index: usize, packet: &Packet, class: &Classification<'_>) -> Self {
        let payload: &[u8] = match packet.body() {
            Some(body) if class.band().is_some() => &body[1..],
            Some(body) => body,
            None => &[],
        };
        Self {
            index,
            packet: packet.kind_name(),
            wire_size: packet.wire_size(),
            class: class.label(),
            band: class.band().map(|band| band.name()),
            payload_size: payload.len(),
            payload: payload_preview(payload),
        }
    }
}

pub fn print_records(records: &[PacketRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "PACKET", "CLASS", "SIZE", "PAYLOAD"]);
            for record in records {
                table.add_row(vec![
                    record.index.to_string(),
                    record.packet.to_string(),
                    record.class.to_string(),
                    record.payload_size.to_string(),
                    record.payload.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!(
                    "#{} {} class={} size={} payload={}",
                    record.index, record.packet, record.class, record.payload_size, record.payload
                );
            }
        }
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if text.chars().count() > PREVIEW_CHARS => {
            let head: String = text.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head.escape_debug())
        }
        Ok(text) => text.escape_debug().to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
