use std::io::{ErrorKind, Read};
use std::time::Duration;

use rtuserve_frame::decode_frame;
use rtuserve_transport::PortHandle;
use tracing::{debug, error, info, trace, warn};

use crate::dispatch::RequestSender;
use crate::error::{ListenerError, Result};
use crate::request::Request;
use crate::signal::ShutdownSignal;

/// Read buffer size. Large enough for any RTU frame.
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// Pause after a would-block or interrupted read.
pub const TRANSIENT_BACKOFF: Duration = Duration::from_millis(10);

/// Lifecycle of a [`PortListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Running,
    Stopping,
    Stopped,
}

/// How one read on the port turned out.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n > 0` bytes were read.
    Data(usize),
    /// The read deadline passed with nothing on the line.
    Timeout,
    /// Would-block or interrupted; worth retrying after a short pause.
    Transient,
    /// End of stream.
    Closed,
    /// Anything else. Terminal.
    Failed(std::io::Error),
}

/// Map a raw read result onto the listener's error classes.
pub fn classify_read(result: std::io::Result<usize>) -> ReadOutcome {
    match result {
        Ok(0) => ReadOutcome::Closed,
        Ok(n) => ReadOutcome::Data(n),
        Err(err) => match err.kind() {
            ErrorKind::TimedOut => ReadOutcome::Timeout,
            ErrorKind::WouldBlock | ErrorKind::Interrupted => ReadOutcome::Transient,
            ErrorKind::UnexpectedEof => ReadOutcome::Closed,
            _ => ReadOutcome::Failed(err),
        },
    }
}

/// Per-listener frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Frames decoded and handed to the dispatch channel.
    pub accepted: u64,
    /// Reads discarded as malformed.
    pub rejected: u64,
}

/// Accept loop for one serial port.
///
/// Each read is taken to be exactly one frame. Frames split across reads, or
/// several frames coalesced into one read, are rejected as malformed.
pub struct PortListener<R> {
    reader: R,
    port: PortHandle,
    dispatch: RequestSender,
    shutdown: ShutdownSignal,
    buffer_size: usize,
    state: ListenerState,
    stats: ListenerStats,
}

impl<R: Read> PortListener<R> {
    /// Create a listener reading from `reader`; requests carry `port`.
    pub fn new(
        reader: R,
        port: PortHandle,
        dispatch: RequestSender,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            reader,
            port,
            dispatch,
            shutdown,
            buffer_size: DEFAULT_BUFFER_SIZE,
            state: ListenerState::Running,
            stats: ListenerStats::default(),
        }
    }

    /// Override the read buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    pub fn port(&self) -> &PortHandle {
        &self.port
    }

    /// Run until shutdown, end of stream, or a fatal error.
    ///
    /// Shutdown and end of stream return `Ok(())`. Malformed frames are
    /// logged and skipped; they never end the loop.
    pub fn run(&mut self) -> Result<()> {
        let result = self.accept_loop();
        self.state = ListenerState::Stopped;
        info!(
            port = self.port.name(),
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            "listener stopped"
        );
        result
    }

    fn accept_loop(&mut self) -> Result<()> {
        loop {
            if self.shutdown.is_triggered() {
                self.state = ListenerState::Stopping;
                debug!(port = self.port.name(), "shutdown observed");
                return Ok(());
            }

            let mut buf = vec![0u8; self.buffer_size];
            match classify_read(self.reader.read(&mut buf)) {
                ReadOutcome::Timeout => {
                    trace!(port = self.port.name(), "read timed out");
                }
                ReadOutcome::Transient => {
                    std::thread::sleep(TRANSIENT_BACKOFF);
                }
                ReadOutcome::Closed => {
                    self.state = ListenerState::Stopping;
                    debug!(port = self.port.name(), "serial stream closed");
                    return Ok(());
                }
                ReadOutcome::Failed(err) => {
                    self.state = ListenerState::Stopping;
                    error!(port = self.port.name(), error = %err, "serial read error");
                    return Err(ListenerError::Io {
                        port: self.port.name().to_string(),
                        source: err,
                    });
                }
                ReadOutcome::Data(n) => self.accept_packet(&buf[..n])?,
            }
        }
    }

    fn accept_packet(&mut self, packet: &[u8]) -> Result<()> {
        let frame = match decode_frame(packet) {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.rejected += 1;
                warn!(
                    port = self.port.name(),
                    len = packet.len(),
                    error = %err,
                    "discarding bad serial frame"
                );
                return Ok(());
            }
        };

        debug!(
            port = self.port.name(),
            address = frame.address,
            function = frame.function,
            len = packet.len(),
            "accepted frame"
        );

        let request = Request::new(self.port.clone(), frame);
        if let Err(err) = self.dispatch.send(request) {
            self.state = ListenerState::Stopping;
            warn!(port = self.port.name(), "dispatch channel closed");
            return Err(err);
        }
        self.stats.accepted += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Instant;

    use rtuserve_frame::{crc16, Frame};

    use super::*;
    use crate::dispatch::{channel, RequestReceiver};

    enum Step {
        Bytes(Vec<u8>),
        Fail(ErrorKind),
        Eof,
    }

    /// Replays a fixed script of reads. Once the script runs out it reports
    /// timeouts, triggering `on_exhausted` the first time if set.
    struct ScriptedPort {
        steps: VecDeque<Step>,
        on_exhausted: Option<ShutdownSignal>,
        reads: usize,
    }

    impl ScriptedPort {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
                on_exhausted: None,
                reads: 0,
            }
        }

        fn then_shutdown(mut self, signal: &ShutdownSignal) -> Self {
            self.on_exhausted = Some(signal.clone());
            self
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            match self.steps.pop_front() {
                Some(Step::Bytes(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Step::Fail(kind)) => Err(std::io::Error::from(kind)),
                Some(Step::Eof) => Ok(0),
                None => {
                    if let Some(signal) = self.on_exhausted.take() {
                        signal.trigger();
                    }
                    Err(std::io::Error::from(ErrorKind::TimedOut))
                }
            }
        }
    }

    fn wire(address: u8, function: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![address, function];
        bytes.extend_from_slice(payload);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }

    fn listener(
        port: ScriptedPort,
        capacity: usize,
    ) -> (PortListener<ScriptedPort>, RequestReceiver, ShutdownSignal) {
        let (tx, rx) = channel(capacity);
        let signal = ShutdownSignal::new();
        let handle = PortHandle::new("/dev/ttyTEST", std::io::sink());
        (PortListener::new(port, handle, tx, signal.clone()), rx, signal)
    }

    #[test]
    fn timeouts_then_shutdown_stop_cleanly_without_requests() {
        let signal = ShutdownSignal::new();
        let steps = (0..25).map(|_| Step::Fail(ErrorKind::TimedOut)).collect();
        let port = ScriptedPort::new(steps).then_shutdown(&signal);
        let (tx, rx) = channel(8);
        let handle = PortHandle::new("/dev/ttyTEST", std::io::sink());
        let mut listener = PortListener::new(port, handle, tx, signal);

        assert_eq!(listener.state(), ListenerState::Running);
        listener.run().unwrap();

        assert_eq!(listener.state(), ListenerState::Stopped);
        assert_eq!(listener.reader.reads, 26);
        assert!(rx.drain().is_empty());
        assert_eq!(listener.stats(), ListenerStats::default());
    }

    #[test]
    fn three_frames_enqueue_three_requests_in_order() {
        let port = ScriptedPort::new(vec![
            Step::Bytes(wire(1, 0x03, &[0x00, 0x00, 0x00, 0x01])),
            Step::Bytes(wire(2, 0x04, &[0x00, 0x10, 0x00, 0x02])),
            Step::Bytes(wire(3, 0x06, &[0x00, 0x01, 0x00, 0xFF])),
            Step::Eof,
        ]);
        let (mut listener, rx, _signal) = listener(port, 8);
        let origin = listener.port().clone();

        listener.run().unwrap();

        let requests = rx.drain();
        let addresses: Vec<u8> = requests.iter().map(|r| r.frame().address).collect();
        assert_eq!(addresses, vec![1, 2, 3]);
        assert_eq!(requests[1].frame().function, 0x04);
        assert_eq!(requests[2].frame().payload.as_ref(), &[0x00, 0x01, 0x00, 0xFF]);
        assert!(requests.iter().all(|r| r.port().same_port(&origin)));
        assert_eq!(listener.stats().accepted, 3);
    }

    #[test]
    fn malformed_frame_between_valid_frames_is_dropped() {
        let mut corrupt = wire(7, 0x03, &[0x00, 0x00, 0x00, 0x01]);
        corrupt[3] ^= 0xFF;

        let port = ScriptedPort::new(vec![
            Step::Bytes(wire(1, 0x03, &[0x00, 0x00, 0x00, 0x01])),
            Step::Bytes(corrupt),
            Step::Bytes(wire(2, 0x03, &[0x00, 0x00, 0x00, 0x01])),
        ]);
        let signal = ShutdownSignal::new();
        let port = port.then_shutdown(&signal);
        let (tx, rx) = channel(8);
        let mut listener = PortListener::new(
            port,
            PortHandle::new("/dev/ttyTEST", std::io::sink()),
            tx,
            signal,
        );

        listener.run().unwrap();

        let addresses: Vec<u8> = rx.drain().iter().map(|r| r.frame().address).collect();
        assert_eq!(addresses, vec![1, 2]);
        assert_eq!(
            listener.stats(),
            ListenerStats {
                accepted: 2,
                rejected: 1
            }
        );
        // The listener kept reading past the bad frame until shutdown.
        assert_eq!(listener.reader.reads, 4);
    }

    #[test]
    fn short_read_is_discarded() {
        let port = ScriptedPort::new(vec![Step::Bytes(vec![0x01, 0x03]), Step::Eof]);
        let (mut listener, rx, _signal) = listener(port, 1);
        listener.run().unwrap();
        assert!(rx.drain().is_empty());
        assert_eq!(listener.stats().rejected, 1);
    }

    #[test]
    fn would_block_backs_off_and_continues() {
        let port = ScriptedPort::new(vec![
            Step::Fail(ErrorKind::WouldBlock),
            Step::Fail(ErrorKind::Interrupted),
            Step::Bytes(wire(5, 0x01, &[0x00, 0x13, 0x00, 0x25])),
            Step::Eof,
        ]);
        let (mut listener, rx, _signal) = listener(port, 1);

        let started = Instant::now();
        listener.run().unwrap();

        assert!(started.elapsed() >= TRANSIENT_BACKOFF * 2);
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn end_of_stream_stops_without_error() {
        for step in [Step::Eof, Step::Fail(ErrorKind::UnexpectedEof)] {
            let (mut listener, _rx, _signal) = listener(ScriptedPort::new(vec![step]), 1);
            assert!(listener.run().is_ok());
            assert_eq!(listener.state(), ListenerState::Stopped);
        }
    }

    #[test]
    fn other_read_errors_are_fatal() {
        let port = ScriptedPort::new(vec![
            Step::Bytes(wire(1, 0x03, &[0x00, 0x00, 0x00, 0x01])),
            Step::Fail(ErrorKind::BrokenPipe),
            Step::Bytes(wire(2, 0x03, &[0x00, 0x00, 0x00, 0x01])),
        ]);
        let (mut listener, rx, _signal) = listener(port, 8);

        let err = listener.run().unwrap_err();

        assert!(matches!(
            &err,
            ListenerError::Io { port, source }
                if port == "/dev/ttyTEST" && source.kind() == ErrorKind::BrokenPipe
        ));
        assert_eq!(listener.state(), ListenerState::Stopped);
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn closed_dispatch_channel_stops_listener() {
        let port = ScriptedPort::new(vec![Step::Bytes(wire(1, 0x03, &[0x00, 0x00, 0x00, 0x01]))]);
        let (mut listener, rx, _signal) = listener(port, 1);
        drop(rx);

        assert!(matches!(listener.run(), Err(ListenerError::DispatchClosed)));
        assert_eq!(listener.stats().accepted, 0);
    }

    #[test]
    fn shutdown_before_start_never_reads() {
        let (mut listener, _rx, signal) = listener(ScriptedPort::new(vec![]), 1);
        signal.trigger();
        listener.run().unwrap();
        assert_eq!(listener.reader.reads, 0);
    }

    #[test]
    fn small_buffer_truncates_read_into_malformed_frame() {
        let frame = wire(1, 0x10, &[0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]);
        let port = ChunkedPort { bytes: frame, pos: 0 };
        let (tx, rx) = channel(4);
        let mut listener = PortListener::new(
            port,
            PortHandle::new("/dev/ttyTEST", std::io::sink()),
            tx,
            ShutdownSignal::new(),
        )
        .with_buffer_size(6);

        listener.run().unwrap();

        // 13 bytes arrive as reads of 6, 6 and 1.
        assert!(rx.drain().is_empty());
        assert_eq!(listener.stats().rejected, 3);
    }

    /// Scribbles over the whole buffer, records whether it arrived zeroed,
    /// and reports a short read.
    struct DirtyingPort {
        reads_left: usize,
        saw_dirty_buffer: bool,
    }

    impl Read for DirtyingPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.reads_left == 0 {
                return Ok(0);
            }
            self.reads_left -= 1;
            if buf.iter().any(|b| *b != 0) {
                self.saw_dirty_buffer = true;
            }
            buf.fill(0xAA);
            Ok(2)
        }
    }

    #[test]
    fn every_read_gets_a_fresh_buffer() {
        let (tx, rx) = channel(1);
        let mut listener = PortListener::new(
            DirtyingPort {
                reads_left: 3,
                saw_dirty_buffer: false,
            },
            PortHandle::new("/dev/ttyTEST", std::io::sink()),
            tx,
            ShutdownSignal::new(),
        );

        listener.run().unwrap();

        assert!(!listener.reader.saw_dirty_buffer);
        assert_eq!(listener.stats().rejected, 3);
        assert!(rx.drain().is_empty());
    }

    /// Yields at most `buf.len()` bytes per read, then EOF.
    struct ChunkedPort {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ChunkedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn classify_read_covers_error_taxonomy() {
        assert!(matches!(classify_read(Ok(4)), ReadOutcome::Data(4)));
        assert!(matches!(classify_read(Ok(0)), ReadOutcome::Closed));
        assert!(matches!(
            classify_read(Err(ErrorKind::TimedOut.into())),
            ReadOutcome::Timeout
        ));
        assert!(matches!(
            classify_read(Err(ErrorKind::WouldBlock.into())),
            ReadOutcome::Transient
        ));
        assert!(matches!(
            classify_read(Err(ErrorKind::PermissionDenied.into())),
            ReadOutcome::Failed(_)
        ));
    }

    #[test]
    fn frames_round_trip_through_listener_unchanged() {
        let frame = Frame::new(0x2A, 0x10, vec![0x00, 0x01, 0x00, 0x01, 0x02, 0xAB, 0xCD]);
        let port = ScriptedPort::new(vec![
            Step::Bytes(frame.to_bytes().unwrap().to_vec()),
            Step::Eof,
        ]);
        let (mut listener, rx, _signal) = listener(port, 1);
        listener.run().unwrap();
        assert_eq!(rx.drain()[0].frame(), &frame);
    }

    #[test]
    #[cfg(unix)]
    fn unix_socket_would_block_then_frames_then_eof() {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let (mut device, line) = UnixStream::pair().unwrap();
        // Socket read timeouts surface as WouldBlock on Unix.
        line.set_read_timeout(Some(Duration::from_millis(20))).unwrap();

        let writer = std::thread::spawn(move || {
            for address in 1..=3u8 {
                std::thread::sleep(Duration::from_millis(60));
                device
                    .write_all(&wire(address, 0x03, &[0x00, 0x00, 0x00, 0x02]))
                    .unwrap();
            }
            std::thread::sleep(Duration::from_millis(60));
        });

        let (tx, rx) = channel(8);
        let mut listener = PortListener::new(
            line,
            PortHandle::new("uds-pair", std::io::sink()),
            tx,
            ShutdownSignal::new(),
        );
        listener.run().unwrap();
        writer.join().unwrap();

        let addresses: Vec<u8> = rx.drain().iter().map(|r| r.frame().address).collect();
        assert_eq!(addresses, vec![1, 2, 3]);
    }
}
