use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use rtuserve::listener::{
    ExitNotice, ListenOptions, ListenerError, Request, RequestReceiver, Server, ServerConfig,
    ShutdownSignal, DEFAULT_DISPATCH_CAPACITY,
};
use rtuserve::transport::SerialConfig;
use serde::Deserialize;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{listener_error, CliError, CliResult, CONFIG_ERROR, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_request, OutputFormat};

/// How often the print loop wakes up to check for Ctrl-C and exits.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Layout of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListenFile {
    ports: Vec<SerialConfig>,
    dispatch_capacity: Option<usize>,
}

#[derive(Debug)]
struct ListenPlan {
    ports: Vec<SerialConfig>,
    dispatch_capacity: usize,
}

/// What the print loop does with each request.
#[derive(Debug, Clone, Copy, Default)]
struct Session {
    count: Option<usize>,
    echo: bool,
}

#[derive(Debug, Default)]
struct Summary {
    printed: usize,
    failure: Option<Arc<ListenerError>>,
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let plan = build_plan(&args)?;

    let (server, requests) = Server::new(ServerConfig {
        dispatch_capacity: plan.dispatch_capacity,
    });
    let (exit_tx, exit_rx) = mpsc::channel();

    for config in &plan.ports {
        let options = ListenOptions::default().notify_exit(exit_tx.clone());
        if let Err(err) = server.start(config, options) {
            stop_and_drain(&server, &requests, |_| {});
            return Err(listener_error(
                &format!("listen on {} failed", config.path),
                &err,
            ));
        }
    }
    drop(exit_tx);

    install_ctrlc_handler(server.shutdown_signal())?;

    let session = Session {
        count: args.count,
        echo: args.echo,
    };
    let summary = serve(
        &server,
        &requests,
        &exit_rx,
        plan.ports.len(),
        session,
        |request| print_request(request, format),
    );
    finish(summary)
}

/// Print requests until Ctrl-C, the request limit, or every listener has
/// stopped, then shut the server down without stranding queued requests.
fn serve(
    server: &Server,
    requests: &RequestReceiver,
    exits: &Receiver<ExitNotice>,
    mut running: usize,
    session: Session,
    mut emit: impl FnMut(&Request),
) -> Summary {
    let shutdown = server.shutdown_signal();
    let mut summary = Summary::default();
    let limit_reached = |printed: usize| session.count.is_some_and(|count| printed >= count);

    let mut handle = |request: Request, summary: &mut Summary| {
        if limit_reached(summary.printed) {
            return;
        }
        emit(&request);
        if session.echo {
            if let Err(err) = request.respond(request.frame()) {
                tracing::warn!(port = request.port().name(), error = %err, "echo failed");
            }
        }
        summary.printed += 1;
    };

    while !shutdown.is_triggered() && running > 0 && !limit_reached(summary.printed) {
        match requests.recv_timeout(POLL_INTERVAL) {
            Ok(request) => handle(request, &mut summary),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        running -= collect_exits(exits, &mut summary);
    }

    // Requests still in flight are printed unless the limit was hit, in which
    // case they are only consumed so no listener stays blocked.
    stop_and_drain(server, requests, |request| handle(request, &mut summary));
    collect_exits(exits, &mut summary);
    summary
}

/// Run `shutdown()` while receiving, so a listener blocked on a full channel
/// can finish its push and see the signal.
fn stop_and_drain(
    server: &Server,
    requests: &RequestReceiver,
    mut on_request: impl FnMut(Request),
) {
    std::thread::scope(|scope| {
        let stopper = scope.spawn(|| server.shutdown());
        while !stopper.is_finished() {
            if let Ok(request) = requests.recv_timeout(POLL_INTERVAL) {
                on_request(request);
            }
        }
    });
    for request in requests.drain() {
        on_request(request);
    }
}

fn collect_exits(exits: &Receiver<ExitNotice>, summary: &mut Summary) -> usize {
    let mut stopped = 0;
    while let Ok(notice) = exits.try_recv() {
        stopped += 1;
        if let Some(err) = notice.error {
            tracing::error!(port = %notice.port, error = %err, "listener stopped");
            summary.failure = Some(err);
        }
    }
    stopped
}

fn finish(summary: Summary) -> CliResult<i32> {
    match summary.failure {
        Some(err) => Err(listener_error("listener stopped", &err)),
        None => Ok(SUCCESS),
    }
}

fn build_plan(args: &ListenArgs) -> CliResult<ListenPlan> {
    let read_timeout = parse_duration(&args.read_timeout)?;

    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => ListenFile::default(),
    };

    let mut ports = file.ports;
    ports.extend(args.ports.iter().map(|path| SerialConfig {
        path: path.clone(),
        baud_rate: args.baud,
        data_bits: args.data_bits,
        parity: args.parity,
        stop_bits: args.stop_bits,
        read_timeout,
    }));

    if ports.is_empty() {
        return Err(CliError::new(
            USAGE,
            "no serial ports given (pass a device path or --config)",
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for port in &ports {
        if !seen.insert(port.path.as_str()) {
            return Err(CliError::new(
                USAGE,
                format!("port listed more than once: {}", port.path),
            ));
        }
    }

    let dispatch_capacity = args
        .queue
        .or(file.dispatch_capacity)
        .unwrap_or(DEFAULT_DISPATCH_CAPACITY);

    Ok(ListenPlan {
        ports,
        dispatch_capacity,
    })
}

fn load_config(path: &Path) -> CliResult<ListenFile> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        CliError::new(
            CONFIG_ERROR,
            format!("cannot read config {}: {err}", path.display()),
        )
    })?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            CONFIG_ERROR,
            format!("invalid config {}: {err}", path.display()),
        )
    })
}

fn install_ctrlc_handler(shutdown: ShutdownSignal) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.trigger();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
