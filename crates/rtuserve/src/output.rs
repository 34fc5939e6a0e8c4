use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rtuserve::frame::function::function_name;
use rtuserve::listener::Request;
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

#[derive(Serialize)]
struct RequestOutput<'a> {
    port: &'a str,
    address: u8,
    function: u8,
    function_name: &'static str,
    exception: bool,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_request(request: &Request, format: OutputFormat) {
    let frame = request.frame();
    match format {
        OutputFormat::Json => {
            let out = RequestOutput {
                port: request.port().name(),
                address: frame.address,
                function: frame.function,
                function_name: function_name(frame.function),
                exception: frame.is_exception(),
                payload_size: frame.payload.len(),
                payload: hex(&frame.payload),
                timestamp: now_unix_seconds(),
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
                .set_header(vec!["PORT", "ADDRESS", "FUNCTION", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    request.port().name().to_string(),
                    frame.address.to_string(),
                    format!("{:#04x} ({})", frame.function, function_name(frame.function)),
                    frame.payload.len().to_string(),
                    hex(&frame.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "port={} address={} function={:#04x} ({}) size={} payload={}",
                request.port().name(),
                frame.address,
                frame.function,
                function_name(frame.function),
                frame.payload.len(),
                hex(&frame.payload)
            );
        }
        OutputFormat::Raw => match frame.to_bytes() {
            Ok(bytes) => print_raw(&bytes),
            Err(err) => tracing::warn!(error = %err, "cannot re-encode frame for raw output"),
        },
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space-separated uppercase hex, the way serial monitors show frames.
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
