/// Errors that can occur while opening or writing to a serial port.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// Failed to obtain a second handle for response writes.
    #[error("failed to clone handle for {path}: {source}")]
    Clone {
        path: String,
        source: serialport::Error,
    },

    /// The serial configuration cannot be applied.
    #[error("invalid serial configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred on the port.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this error was raised while opening the device.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Clone { .. } | Self::InvalidConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
