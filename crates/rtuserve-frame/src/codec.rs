use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::{FrameError, Result};
use crate::function::EXCEPTION_FLAG;

/// Trailing CRC: 2 bytes, low byte first.
pub const CRC_SIZE: usize = 2;

/// Smallest valid frame: address (1) + function (1) + payload (1) + CRC (2).
pub const MIN_FRAME_LEN: usize = 5;

/// Largest frame the RTU line protocol allows.
pub const MAX_FRAME_LEN: usize = 256;

/// Largest payload that fits in [`MAX_FRAME_LEN`].
pub const MAX_PAYLOAD: usize = MAX_FRAME_LEN - 2 - CRC_SIZE;

/// A Modbus RTU frame without its CRC.
///
/// Frames returned by [`decode_frame`] have passed the length and CRC checks.
/// Frames built with [`Frame::new`] or the response builders have not; they
/// get a fresh CRC when encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Station address the frame targets.
    pub address: u8,
    /// Function code, with the exception flag set on exception responses.
    pub function: u8,
    /// Function payload between the function code and the CRC.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(address: u8, function: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            function,
            payload: payload.into(),
        }
    }

    /// A response to this frame: same address and function, new payload.
    pub fn reply(&self, payload: impl Into<Bytes>) -> Self {
        Self::new(self.address, self.function, payload)
    }

    /// An exception response to this frame carrying `code`.
    pub fn exception(&self, code: u8) -> Self {
        Self::new(
            self.address,
            self.function | EXCEPTION_FLAG,
            Bytes::copy_from_slice(&[code]),
        )
    }

    /// Whether the function code carries the exception flag.
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_FLAG != 0
    }

    /// The total wire size of this frame (address, function, payload, CRC).
    pub fn wire_size(&self) -> usize {
        2 + self.payload.len() + CRC_SIZE
    }

    /// Encode into a standalone buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, &mut dst)?;
        Ok(dst.freeze())
    }
}

/// Decode one frame from `src`.
///
/// The whole slice is taken as exactly one frame:
/// ```text
/// ┌─────────┬──────────┬──────────────────┬──────────────┐
/// │ Address │ Function │ Payload          │ CRC (2B LE)  │
/// │ (1B)    │ (1B)     │ (len - 4 bytes)  │ over [0..-2] │
/// └─────────┴──────────┴──────────────────┴──────────────┘
/// ```
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    if src.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort { len: src.len() });
    }

    let (body, trailer) = src.split_at(src.len() - CRC_SIZE);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    let expected = crc16(body);
    if received != expected {
        return Err(FrameError::CrcMismatch { expected, received });
    }

    Ok(Frame {
        address: body[0],
        function: body[1],
        payload: Bytes::copy_from_slice(&body[2..]),
    })
}

/// Encode a frame into the wire format, appending a freshly computed CRC.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: frame.payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let start = dst.len();
    dst.reserve(frame.wire_size());
    dst.put_u8(frame.address);
    dst.put_u8(frame.function);
    dst.put_slice(&frame.payload);
    let crc = crc16(&dst[start..]);
    dst.put_u16_le(crc);
    Ok(())
}
