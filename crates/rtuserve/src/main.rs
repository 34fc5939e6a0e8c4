mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rtuserve", version, about = "Modbus RTU serial listener")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "RTUSERVE_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listen_subcommand() {
        let cli = Cli::try_parse_from([
            "rtuserve",
            "listen",
            "/dev/ttyUSB0",
            "/dev/ttyUSB1",
            "--baud",
            "9600",
            "--parity",
            "even",
            "--count",
            "3",
        ])
        .expect("listen args should parse");

        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.ports, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
                assert_eq!(args.baud, 9600);
                assert_eq!(args.parity, rtuserve::transport::Parity::Even);
                assert_eq!(args.count, Some(3));
                assert!(!args.echo);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_parity() {
        let err = Cli::try_parse_from(["rtuserve", "listen", "/dev/ttyS0", "--parity", "mark"])
            .expect_err("invalid parity should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_invalid_data_bits() {
        let err = Cli::try_parse_from(["rtuserve", "listen", "/dev/ttyS0", "--data-bits", "9"])
            .expect_err("invalid data bits should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_ports_subcommand() {
        let cli = Cli::try_parse_from(["rtuserve", "--format", "json", "ports"])
            .expect("ports args should parse");
        assert!(matches!(cli.command, Command::Ports(_)));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
