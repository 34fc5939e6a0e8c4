use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::error::{Result, TransportError};

/// Read half of an open serial device.
pub type SerialReader = Box<dyn serialport::SerialPort>;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Identity and write half of an open serial port.
///
/// Cloning is cheap; every clone writes through the same mutex, so responses
/// from concurrent pipeline workers never interleave on the wire. The read
/// half is never reachable from here.
#[derive(Clone)]
pub struct PortHandle {
    name: Arc<str>,
    writer: SharedWriter,
}

impl PortHandle {
    /// Wrap an arbitrary writer as a port handle.
    pub fn new(name: impl Into<Arc<str>>, writer: impl Write + Send + 'static) -> Self {
        Self {
            name: name.into(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Device name this handle was opened from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `bytes` to the port and flush.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(bytes)?;
        writer.flush()?;
        debug!(port = %self.name, len = bytes.len(), "wrote to serial port");
        Ok(())
    }

    /// Whether both handles refer to the same opened device.
    pub fn same_port(&self, other: &PortHandle) -> bool {
        Arc::ptr_eq(&self.writer, &other.writer)
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("name", &self.name)
            .finish()
    }
}

/// A freshly opened serial device, split into its two halves.
pub struct OpenPort {
    pub reader: SerialReader,
    pub handle: PortHandle,
}

/// Open and configure the device described by `config`.
///
/// The read timeout from the config is applied to the device so that a
/// blocked read returns `ErrorKind::TimedOut` once the deadline passes.
pub fn open(config: &SerialConfig) -> Result<OpenPort> {
    config.validate()?;

    let reader = serialport::new(config.path.as_str(), config.baud_rate)
        .data_bits(config.data_bits.into())
        .parity(config.parity.into())
        .stop_bits(config.stop_bits.into())
        .flow_control(serialport::FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|source| TransportError::Open {
            path: config.path.clone(),
            source,
        })?;

    let writer = reader.try_clone().map_err(|source| TransportError::Clone {
        path: config.path.clone(),
        source,
    })?;

    info!(
        port = %config.path,
        baud = config.baud_rate,
        parity = %config.parity,
        "opened serial port"
    );

    Ok(OpenPort {
        reader,
        handle: PortHandle::new(config.path.as_str(), writer),
    })
}
