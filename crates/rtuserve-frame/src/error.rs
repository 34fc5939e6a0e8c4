use crate::codec::MIN_FRAME_LEN;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The buffer cannot hold address, function, payload and CRC.
    #[error("malformed frame: {len} bytes, need at least {MIN_FRAME_LEN}")]
    TooShort { len: usize },

    /// The trailing CRC does not match the frame contents.
    #[error("malformed frame: crc mismatch (expected {expected:#06x}, received {received:#06x})")]
    CrcMismatch { expected: u16, received: u16 },

    /// The payload exceeds what fits in a single RTU frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl FrameError {
    /// Whether this error describes corrupt input bytes, as opposed to a
    /// caller trying to encode something unrepresentable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::TooShort { .. } | Self::CrcMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
