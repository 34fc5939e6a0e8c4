use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use crate::error::{ListenerError, Result};
use crate::request::Request;

/// Default number of requests buffered before listeners block.
pub const DEFAULT_DISPATCH_CAPACITY: usize = 64;

/// Create a bounded dispatch channel holding at most `capacity` requests.
///
/// Senders block once the channel is full; that is the only back-pressure
/// between the serial lines and the request pipeline.
pub fn channel(capacity: usize) -> (RequestSender, RequestReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (RequestSender { inner: tx }, RequestReceiver { inner: rx })
}

/// Producer side of the dispatch channel. One clone per listener.
#[derive(Debug, Clone)]
pub struct RequestSender {
    inner: mpsc::SyncSender<Request>,
}

impl RequestSender {
    /// Push a request, blocking while the channel is full.
    pub fn send(&self, request: Request) -> Result<()> {
        self.inner
            .send(request)
            .map_err(|_| ListenerError::DispatchClosed)
    }
}

/// Consumer side of the dispatch channel.
#[derive(Debug)]
pub struct RequestReceiver {
    inner: mpsc::Receiver<Request>,
}

impl RequestReceiver {
    /// Block until a request arrives. `None` once every sender is gone.
    pub fn recv(&self) -> Option<Request> {
        self.inner.recv().ok()
    }

    /// Block for at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<Request, RecvTimeoutError> {
        self.inner.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> std::result::Result<Request, TryRecvError> {
        self.inner.try_recv()
    }

    /// Iterate until every sender is gone.
    pub fn iter(&self) -> impl Iterator<Item = Request> + '_ {
        self.inner.iter()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<Request> {
        self.inner.try_iter().collect()
    }
}
