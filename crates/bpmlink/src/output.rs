use std::io::{self, IsTerminal, Write};

use bpmlink_client::{CallResult, Operation, Sample, TableKind};
use bpmlink_frame::Message;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Serialize)]
struct PacketOutput {
    command: u8,
    payload_size: usize,
    payload: String,
}

#[derive(Serialize)]
struct CallOutput<'a> {
    table: TableKind,
    name: &'a str,
    operation: Operation,
    input: String,
    output_size: usize,
    output: String,
}

#[derive(Serialize)]
struct SampleOutput {
    seq: u64,
    slot: usize,
    size: usize,
    data: String,
}

pub fn print_packet(message: &Message, format: OutputFormat) {
    let payload = hex::encode(&message.payload);
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                command: message.command,
                payload_size: message.payload.len(),
                payload,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    format!("{:#04x}", message.command),
                    message.payload.len().to_string(),
                    payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "command={:#04x} size={} payload={}",
                message.command,
                message.payload.len(),
                payload
            );
        }
        OutputFormat::Raw => print_raw(&message.payload),
    }
}

/// Results in report order. Raw output concatenates every output buffer.
pub fn print_results(results: &[CallResult<'_>], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<CallOutput<'_>> = results
                .iter()
                .map(|r| CallOutput {
                    table: r.table,
                    name: r.name,
                    operation: r.operation,
                    input: hex::encode(r.input),
                    output_size: r.output.len(),
                    output: hex::encode(r.output),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TABLE", "OPERATION", "ID", "INPUT", "OUTPUT"]);
            for r in results {
                table.add_row(vec![
                    r.table.name().to_string(),
                    r.name.to_string(),
                    format!("{:#04x}", r.operation.id()),
                    hex::encode(r.input),
                    preview(r.output),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for r in results {
                println!(
                    "{} id={:#04x} input={} output={}",
                    r.name,
                    r.operation.id(),
                    hex::encode(r.input),
                    preview(r.output)
                );
            }
        }
        OutputFormat::Raw => {
            for r in results {
                print_raw(r.output);
            }
        }
    }
}

/// One poll sample as a single line (JSON Lines for `json`). Tables do not
/// stream, so `table` prints like `pretty`.
pub fn write_sample(out: &mut impl Write, sample: &Sample<'_>, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let line = SampleOutput {
                seq: sample.seq,
                slot: sample.slot,
                size: sample.data.len(),
                data: hex::encode(sample.data),
            };
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            writeln!(
                out,
                "seq={} slot={} size={} data={}",
                sample.seq,
                sample.slot,
                sample.data.len(),
                preview(sample.data)
            )?;
        }
        OutputFormat::Raw => out.write_all(sample.data)?,
    }
    out.flush()
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Hex for short buffers, size for long curves.
fn preview(data: &[u8]) -> String {
    if data.len() > 64 {
        format!("<{} bytes>", data.len())
    } else {
        hex::encode(data)
    }
}
