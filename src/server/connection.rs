// src/server/connection.rs

//! Per-connection request loop.
//!
//! One of these runs per accepted connection, in its own task. It parses
//! request lines, dispatches them to the launcher / waiter, and writes back
//! exactly one status report per request through a [`ReportSlot`].
//!
//! Failure isolation: anything that breaks this connection's framing is
//! reported as FATAL (when the peer can still hear it) and tears down this
//! connection only; the daemon and every other connection carry on.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::proc::{LaunchSpec, LauncherBackend, ProcessTable, WaitOutcome, wait};
use crate::server::protocol::{Request, Response};
use crate::status::ReportSlot;
use crate::types::ProcessHandle;

/// Whether the request loop should keep serving this connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Serve one accepted TCP connection until EOF, error, or a fatal report.
pub async fn serve_connection(
    stream: TcpStream,
    table: Arc<ProcessTable>,
    launcher: Arc<dyn LauncherBackend>,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    info!(%peer, "connection accepted");

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    serve_io(&mut reader, &mut write_half, table, launcher).await;

    info!(%peer, "connection closed");
}

/// Request loop over arbitrary IO halves (tests drive this with in-memory
/// duplex streams).
pub async fn serve_io<R, W>(
    reader: &mut R,
    writer: &mut W,
    table: Arc<ProcessTable>,
    launcher: Arc<dyn LauncherBackend>,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "read failed; dropping connection");
                break;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line.trim_end()) {
            Ok(req) => req,
            Err(e) => {
                // Unparseable input: framing can no longer be trusted.
                let slot = ReportSlot::new(writer);
                let _ = slot.fill(&Response::fatal(format!("bad request: {e}"))).await;
                break;
            }
        };

        debug!(?request, "request received");

        let flow = match request {
            Request::Run {
                argv,
                detach,
                redirects,
            } => {
                let spec = LaunchSpec {
                    argv,
                    detach,
                    redirects,
                };
                handle_run(writer, launcher.as_ref(), spec).await
            }
            Request::Wait { handle } => handle_wait(reader, writer, &table, handle).await,
        };

        if flow == Flow::Close {
            break;
        }
    }
}

async fn handle_run<W>(writer: &mut W, launcher: &dyn LauncherBackend, spec: LaunchSpec) -> Flow
where
    W: AsyncWrite + Unpin,
{
    let slot = ReportSlot::new(writer);
    let result = match launcher.launch(spec).await {
        Ok(handle) => {
            slot.fill(&Response::ok("process started", Some(handle), None))
                .await
        }
        Err(e) => slot.fill(&Response::error(e.to_string())).await,
    };

    flow_after_write(result)
}

async fn handle_wait<R, W>(
    reader: &mut R,
    writer: &mut W,
    table: &ProcessTable,
    handle: ProcessHandle,
) -> Flow
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = wait(reader, handle, table).await;
    let slot = ReportSlot::new(writer);

    match outcome {
        WaitOutcome::Exited(exit) => {
            let result = slot
                .fill(&Response::ok(exit.to_string(), None, Some(exit)))
                .await;
            flow_after_write(result)
        }
        WaitOutcome::NoSuchProcess => {
            let result = slot
                .fill(&Response::error(
                    AgentError::NoSuchProcess(handle).to_string(),
                ))
                .await;
            flow_after_write(result)
        }
        // The peer cannot hear a response; the slot is dropped unfilled.
        WaitOutcome::ClientGone => Flow::Close,
        WaitOutcome::UnexpectedInput => {
            let _ = slot
                .fill(&Response::fatal("unexpected data while a wait was pending"))
                .await;
            Flow::Close
        }
    }
}

fn flow_after_write(result: std::io::Result<()>) -> Flow {
    match result {
        Ok(()) => Flow::Continue,
        Err(e) => {
            warn!(error = %e, "failed to write status report; dropping connection");
            Flow::Close
        }
    }
}
