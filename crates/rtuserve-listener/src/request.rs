use rtuserve_frame::Frame;
use rtuserve_transport::PortHandle;
use tracing::debug;

use crate::error::Result;

/// A decoded frame together with the port it arrived on.
///
/// Only listeners build requests, and only from frames that passed
/// [`decode_frame`](rtuserve_frame::decode_frame):
///
/// ```compile_fail
/// use rtuserve_frame::Frame;
/// use rtuserve_listener::Request;
/// use rtuserve_transport::PortHandle;
///
/// let port = PortHandle::new("/dev/ttyS0", std::io::sink());
/// let _ = Request::new(port, Frame::new(1, 0x03, vec![0x00]));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    port: PortHandle,
    frame: Frame,
}

impl Request {
    pub(crate) fn new(port: PortHandle, frame: Frame) -> Self {
        Self { port, frame }
    }

    /// Port the frame was read from.
    pub fn port(&self) -> &PortHandle {
        &self.port
    }

    /// The validated frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_parts(self) -> (PortHandle, Frame) {
        (self.port, self.frame)
    }

    /// Encode `response` and write it back to the originating port.
    pub fn respond(&self, response: &Frame) -> Result<()> {
        let bytes = response.to_bytes()?;
        self.port.send(&bytes)?;
        debug!(
            port = self.port.name(),
            address = response.address,
            function = response.function,
            "sent response"
        );
        Ok(())
    }
}
