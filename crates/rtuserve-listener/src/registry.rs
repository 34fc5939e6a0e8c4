use std::collections::HashMap;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use rtuserve_transport::{PortHandle, SerialConfig};
use tracing::{debug, error, info, warn};

use crate::dispatch::{channel, RequestReceiver, RequestSender, DEFAULT_DISPATCH_CAPACITY};
use crate::error::{ListenerError, Result};
use crate::listener::{PortListener, DEFAULT_BUFFER_SIZE};
use crate::signal::ShutdownSignal;

/// Terminal result of one listener. Shared so it can reach both the
/// [`ListenerHandle`] and an optional exit-notification sender.
pub type ExitResult = std::result::Result<(), Arc<ListenerError>>;

/// Delivered to [`ListenOptions::notify_exit`] when a listener stops.
#[derive(Debug, Clone)]
pub struct ExitNotice {
    pub port: String,
    /// `None` for shutdown or end of stream.
    pub error: Option<Arc<ListenerError>>,
}

/// Per-listener options for [`Server::start`].
#[derive(Debug, Clone)]
pub struct ListenOptions {
    /// Receives exactly one [`ExitNotice`] when the listener stops.
    pub notify_exit: Option<Sender<ExitNotice>>,
    /// Read buffer size.
    pub buffer_size: usize,
}

impl ListenOptions {
    pub fn notify_exit(mut self, sender: Sender<ExitNotice>) -> Self {
        self.notify_exit = Some(sender);
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            notify_exit: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Server-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Capacity of the shared dispatch channel.
    pub dispatch_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
        }
    }
}

/// Resolves once with the terminal result of one listener.
#[derive(Debug)]
pub struct ListenerHandle {
    port: String,
    result: Receiver<ExitResult>,
    resolved: Option<ExitResult>,
}

impl ListenerHandle {
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The terminal result if the listener has already stopped.
    pub fn try_result(&mut self) -> Option<&ExitResult> {
        if self.resolved.is_none() {
            match self.result.try_recv() {
                Ok(result) => self.resolved = Some(result),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.resolved = Some(Err(Arc::new(ListenerError::Panicked(
                        self.port.clone(),
                    ))));
                }
            }
        }
        self.resolved.as_ref()
    }

    pub fn is_finished(&mut self) -> bool {
        self.try_result().is_some()
    }

    /// Block until the listener stops.
    pub fn wait(mut self) -> ExitResult {
        if let Some(result) = self.resolved.take() {
            return result;
        }
        self.result
            .recv()
            .unwrap_or_else(|_| Err(Arc::new(ListenerError::Panicked(self.port))))
    }
}

/// Registry of running port listeners and their shared shutdown signal.
///
/// Dropping the server shuts it down, which blocks until every listener has
/// stopped. Keep the dispatch channel drained or dropped while that happens.
pub struct Server {
    shutdown: ShutdownSignal,
    dispatch: RequestSender,
    listeners: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Server {
    /// Create a server and the receiving end of its dispatch channel.
    pub fn new(config: ServerConfig) -> (Self, RequestReceiver) {
        let (tx, rx) = channel(config.dispatch_capacity);
        (Self::with_dispatch(tx), rx)
    }

    /// Create a server pushing into an existing dispatch channel.
    pub fn with_dispatch(dispatch: RequestSender) -> Self {
        Self {
            shutdown: ShutdownSignal::new(),
            dispatch,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Open the port described by `config` and start listening on it.
    ///
    /// Returns as soon as the listener thread is running. Failing to open the
    /// device is reported here and nowhere else.
    pub fn start(&self, config: &SerialConfig, options: ListenOptions) -> Result<ListenerHandle> {
        {
            let listeners = self.lock_listeners();
            self.check_can_register(&listeners, &config.path)?;
        }

        let opened = rtuserve_transport::open(config).inspect_err(|err| {
            error!(port = %config.path, error = %err, "failed to open serial port");
        })?;
        self.start_with_port(opened.reader, opened.handle, options)
    }

    /// Start listening on an already-open reader. `port` names the listener
    /// and is attached to every request it produces.
    pub fn start_with_port<R>(
        &self,
        reader: R,
        port: PortHandle,
        options: ListenOptions,
    ) -> Result<ListenerHandle>
    where
        R: Read + Send + 'static,
    {
        let name = port.name().to_string();
        let mut listeners = self.lock_listeners();
        self.check_can_register(&listeners, &name)?;

        if let Some(stale) = listeners.remove(&name) {
            join_listener(&name, stale);
        }

        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let mut listener = PortListener::new(
            reader,
            port,
            self.dispatch.clone(),
            self.shutdown.clone(),
        )
        .with_buffer_size(options.buffer_size);
        let notify = options.notify_exit;
        let thread_name = name.clone();

        let join = std::thread::Builder::new()
            .name(format!("rtu-listener-{name}"))
            .spawn(move || {
                let result = listener.run().map_err(Arc::new);
                deliver_exit(&thread_name, result, &result_tx, notify.as_ref());
            })
            .map_err(|source| ListenerError::Spawn {
                port: name.clone(),
                source,
            })?;

        listeners.insert(name.clone(), join);
        info!(port = %name, "listener started");

        Ok(ListenerHandle {
            port: name,
            result: result_rx,
            resolved: None,
        })
    }

    /// Signal every listener to stop and wait for all of them.
    ///
    /// Safe to call repeatedly; later calls find nothing left to join.
    pub fn shutdown(&self) {
        if self.shutdown.trigger() {
            info!("shutting down serial listeners");
        }

        // Join outside the lock so active_ports and start never wait on it.
        let listeners = std::mem::take(&mut *self.lock_listeners());
        for (port, join) in listeners {
            join_listener(&port, join);
        }
    }

    /// The signal shared with every listener.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Ports whose listener is still running, sorted.
    pub fn active_ports(&self) -> Vec<String> {
        let listeners = self.lock_listeners();
        let mut ports: Vec<String> = listeners
            .iter()
            .filter(|(_, join)| !join.is_finished())
            .map(|(port, _)| port.clone())
            .collect();
        ports.sort();
        ports
    }

    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_can_register(
        &self,
        listeners: &HashMap<String, JoinHandle<()>>,
        port: &str,
    ) -> Result<()> {
        if self.shutdown.is_triggered() {
            return Err(ListenerError::ShuttingDown);
        }
        match listeners.get(port) {
            Some(join) if !join.is_finished() => {
                Err(ListenerError::AlreadyListening(port.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn deliver_exit(
    port: &str,
    result: ExitResult,
    handle: &SyncSender<ExitResult>,
    notify: Option<&Sender<ExitNotice>>,
) {
    if let Some(notify) = notify {
        let notice = ExitNotice {
            port: port.to_string(),
            error: result.as_ref().err().cloned(),
        };
        if notify.send(notice).is_err() {
            debug!(port, "exit notification receiver dropped");
        }
    }
    // Capacity 1 and a single send: never blocks.
    let _ = handle.try_send(result);
}

fn join_listener(port: &str, join: JoinHandle<()>) {
    if join.join().is_err() {
        warn!(port, "listener thread panicked");
    } else {
        debug!(port, "listener joined");
    }
}
