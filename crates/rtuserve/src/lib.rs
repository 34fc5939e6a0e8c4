//! Serial front end for Modbus RTU servers.
//!
//! rtuserve reads raw bytes from serial lines, validates them as Modbus RTU
//! frames, and hands every good frame to a request pipeline together with the
//! port it came from.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial port configuration, opening and response writes
//! - [`frame`]: RTU frame decoding/encoding and CRC-16
//! - [`listener`]: Per-port accept loops, dispatch channel, shutdown

/// Re-export transport types.
pub mod transport {
    pub use rtuserve_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rtuserve_frame::*;
}

/// Re-export listener types.
pub mod listener {
    pub use rtuserve_listener::*;
}
