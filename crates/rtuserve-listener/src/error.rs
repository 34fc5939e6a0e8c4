/// Errors that can occur in listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Transport-level error (opening the port, writing a response).
    #[error("transport error: {0}")]
    Transport(#[from] rtuserve_transport::TransportError),

    /// Frame-level error while encoding a response.
    #[error("frame error: {0}")]
    Frame(#[from] rtuserve_frame::FrameError),

    /// A read on the port failed in a way that cannot be retried.
    #[error("serial read error on {port}: {source}")]
    Io {
        port: String,
        source: std::io::Error,
    },

    /// Every receiver of the dispatch channel is gone.
    #[error("request dispatch channel closed")]
    DispatchClosed,

    /// The server has been shut down and accepts no new ports.
    #[error("server is shutting down")]
    ShuttingDown,

    /// A listener is already running for this port.
    #[error("already listening on {0}")]
    AlreadyListening(String),

    /// The listener thread could not be started.
    #[error("failed to spawn listener for {port}: {source}")]
    Spawn {
        port: String,
        source: std::io::Error,
    },

    /// The listener thread panicked before reporting a result.
    #[error("listener for {0} panicked")]
    Panicked(String),
}

impl ListenerError {
    /// Whether this error came from failing to open the serial device.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_open_failure())
    }
}

pub type Result<T> = std::result::Result<T, ListenerError>;
