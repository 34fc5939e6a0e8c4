//! Modbus RTU framing.
//!
//! Every RTU frame on the wire is:
//! - a 1-byte station address
//! - a 1-byte function code
//! - the function payload
//! - a 2-byte little-endian CRC-16/MODBUS over everything before it
//!
//! Decoding is pure: a byte slice goes in, a validated [`Frame`] or a
//! [`FrameError`] comes out.

pub mod codec;
pub mod crc;
pub mod error;
pub mod function;

pub use codec::{decode_frame, encode_frame, Frame, CRC_SIZE, MAX_FRAME_LEN, MAX_PAYLOAD, MIN_FRAME_LEN};
pub use crc::crc16;
pub use error::{FrameError, Result};
