use std::io::IsTerminal;
use std::net::SocketAddr;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use manetheren_frame::MessageType;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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

/// One row of the message type registry.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct TypeRow {
    pub value: u8,
    pub direction: &'static str,
    pub service: &'static str,
    pub paired: u8,
    pub requires_aux: bool,
}

impl From<MessageType> for TypeRow {
    fn from(message_type: MessageType) -> Self {
        Self {
            value: message_type.to_wire(),
            direction: message_type.direction().as_str(),
            service: message_type.service().name(),
            paired: message_type.paired().to_wire(),
            requires_aux: message_type.service().requires_aux(),
        }
    }
}

pub fn type_rows() -> Vec<TypeRow> {
    MessageType::all().map(TypeRow::from).collect()
}

pub fn print_types(rows: &[TypeRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "DIRECTION", "SERVICE", "PAIRED", "AUX"]);
            for row in rows {
                table.add_row(vec![
                    row.value.to_string(),
                    row.direction.to_string(),
                    row.service.to_string(),
                    row.paired.to_string(),
                    if row.requires_aux { "required" } else { "optional" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "{:>2} {:<7} {:<8} paired={}",
                    row.value, row.direction, row.service, row.paired
                );
            }
        }
        OutputFormat::Raw => {
            for row in rows {
                println!("{}\t{}\t{}", row.value, row.direction, row.service);
            }
        }
    }
}

/// Summary of a frame handed to the request listener.
#[derive(Serialize, Debug)]
pub struct SentOutput {
    pub addr: String,
    pub message_type: u8,
    pub direction: &'static str,
    pub service: &'static str,
    pub payload_size: usize,
    pub wire_size: usize,
}

impl SentOutput {
    pub fn new(addr: SocketAddr, message_type: MessageType, payload_size: usize, wire_size: usize) -> Self {
        Self {
            addr: addr.to_string(),
            message_type: message_type.to_wire(),
            direction: message_type.direction().as_str(),
            service: message_type.service().name(),
            payload_size,
            wire_size,
        }
    }
}

pub fn print_sent(out: &SentOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDR", "TYPE", "SERVICE", "SIZE"])
                .add_row(vec![
                    out.addr.clone(),
                    format!("{} ({})", out.message_type, out.direction),
                    out.service.to_string(),
                    out.payload_size.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {}:{} ({}) size={} to {}",
                out.direction, out.service, out.message_type, out.payload_size, out.addr
            );
        }
        OutputFormat::Raw => {}
    }
}
