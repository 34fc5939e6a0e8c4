//! Per-port Modbus RTU listeners.
//!
//! A [`Server`] owns any number of serial ports. Each port gets one
//! [`PortListener`] running on its own thread; every listener decodes what it
//! reads into frames and pushes them, paired with the originating
//! [`PortHandle`](rtuserve_transport::PortHandle), onto one shared bounded
//! dispatch channel. The request-processing pipeline sits on the other end of
//! that channel.

pub mod dispatch;
pub mod error;
pub mod listener;
pub mod registry;
pub mod request;
pub mod signal;

pub use dispatch::{channel, RequestReceiver, RequestSender, DEFAULT_DISPATCH_CAPACITY};
pub use error::{ListenerError, Result};
pub use listener::{
    classify_read, ListenerState, ListenerStats, PortListener, ReadOutcome, DEFAULT_BUFFER_SIZE,
    TRANSIENT_BACKOFF,
};
pub use registry::{ExitNotice, ExitResult, ListenOptions, ListenerHandle, Server, ServerConfig};
pub use request::Request;
pub use signal::ShutdownSignal;
