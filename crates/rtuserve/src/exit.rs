use std::fmt;
use std::io;

use rtuserve::frame::FrameError;
use rtuserve::listener::ListenerError;
use rtuserve::transport::TransportError;

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_DEVICE: i32 = 69;
pub const CONFIG_ERROR: i32 = 78;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: &io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => NO_DEVICE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

fn serial_error(context: &str, err: &serialport::Error) -> CliError {
    let code = match err.kind() {
        serialport::ErrorKind::NoDevice => NO_DEVICE,
        serialport::ErrorKind::InvalidInput => USAGE,
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => NO_DEVICE,
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => PERMISSION_DENIED,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: &TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. } | TransportError::Clone { source, .. } => {
            serial_error(context, source)
        }
        TransportError::InvalidConfig(_) => CliError::new(CONFIG_ERROR, format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
    }
}

pub fn frame_error(context: &str, err: &FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn listener_error(context: &str, err: &ListenerError) -> CliError {
    match err {
        ListenerError::Transport(err) => transport_error(context, err),
        ListenerError::Frame(err) => frame_error(context, err),
        ListenerError::Io { source, .. } => io_error(context, source),
        ListenerError::AlreadyListening(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ListenerError::DispatchClosed | ListenerError::ShuttingDown => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
