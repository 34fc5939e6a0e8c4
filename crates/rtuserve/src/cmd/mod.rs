use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use rtuserve::transport::{DataBits, Parity, StopBits, DEFAULT_BAUD_RATE};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen on serial ports and print every valid RTU request.
    Listen(ListenArgs),
    /// List serial ports available on this machine.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial devices to listen on (e.g. /dev/ttyUSB0).
    pub ports: Vec<String>,
    /// JSON file listing ports and server settings.
    #[arg(long, value_name = "FILE", env = "RTUSERVE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Line speed for ports given on the command line.
    #[arg(long, env = "RTUSERVE_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Parity: none, odd or even.
    #[arg(long, env = "RTUSERVE_PARITY", default_value = "none")]
    pub parity: Parity,
    /// Data bits per character (5-8).
    #[arg(long, default_value = "8")]
    pub data_bits: DataBits,
    /// Stop bits (1 or 2).
    #[arg(long, default_value = "1")]
    pub stop_bits: StopBits,
    /// Per-read deadline (e.g. 100ms, 1s).
    #[arg(long, env = "RTUSERVE_READ_TIMEOUT", default_value = "100ms")]
    pub read_timeout: String,
    /// Requests buffered before listeners block.
    #[arg(long)]
    pub queue: Option<usize>,
    /// Exit after printing N requests.
    #[arg(long)]
    pub count: Option<usize>,
    /// Write every request back to its port unchanged.
    #[arg(long)]
    pub echo: bool,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
