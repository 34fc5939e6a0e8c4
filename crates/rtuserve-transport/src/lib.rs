//! Serial transport for Modbus RTU listeners.
//!
//! Opens a serial device from a [`SerialConfig`] and splits it into a read
//! half, owned by exactly one listener, and a cloneable [`PortHandle`] that
//! carries the port identity and serializes response writes.
//!
//! This is the lowest layer of rtuserve. Everything else builds on top of
//! the types provided here.

pub mod config;
pub mod error;
pub mod port;

pub use config::{DataBits, Parity, SerialConfig, StopBits, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use error::{Result, TransportError};
pub use port::{open, OpenPort, PortHandle, SerialReader};
