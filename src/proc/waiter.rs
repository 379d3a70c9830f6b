// src/proc/waiter.rs

//! Cross-source blocking wait: process exit vs. client disconnect.
//!
//! `wait` suspends the calling connection task on a `tokio::select!` over two
//! heterogeneous event sources:
//! - the table entry's state channel, which the reaper flips to `Exited`;
//! - the connection itself, whose read side signals EOF/error when the peer
//!   disconnects (typically because it got tired of waiting).
//!
//! Whichever fires first wins. A process that exits concurrently with a
//! client disconnect may report either outcome; callers tolerate both.
//! The awaited process is never killed on behalf of a vanished client.

use tokio::io::AsyncBufReadExt;
use tracing::{debug, info};

use crate::proc::table::{ProcState, ProcessTable};
use crate::types::{ExitKind, ProcessHandle};

/// Terminal outcome of one wait request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process terminated; the entry has been consumed.
    Exited(ExitKind),
    /// The peer closed the connection first. No response can be sent.
    ClientGone,
    /// Unknown or already-consumed handle; reported as an error, no blocking.
    NoSuchProcess,
    /// The peer sent data while a wait was pending. Framing is broken; the
    /// caller must report FATAL and drop the connection.
    UnexpectedInput,
}

/// Block until the tracked process exits or the requesting client
/// disconnects, whichever happens first.
///
/// `reader` is the buffered read side of the requesting connection. Peeking
/// at it via `fill_buf` consumes nothing, so a well-behaved client that
/// simply keeps the socket open costs no data.
pub async fn wait<R>(reader: &mut R, handle: ProcessHandle, table: &ProcessTable) -> WaitOutcome
where
    R: AsyncBufReadExt + Unpin,
{
    let Some(mut ticket) = table.subscribe(handle) else {
        debug!(handle, "wait on unknown handle");
        return WaitOutcome::NoSuchProcess;
    };
    let detach = ticket.detach;

    debug!(handle, pid = ?ticket.pid, detach, "wait started");

    tokio::select! {
        changed = ticket.state_rx.wait_for(|s| matches!(s, ProcState::Exited(_))) => {
            match changed {
                Ok(state) => {
                    let ProcState::Exited(exit) = *state else {
                        unreachable!("wait_for predicate admits only Exited");
                    };
                    drop(state);
                    // The remove is the consumption point: with several
                    // waiters racing on one handle, only the one that
                    // actually removes the entry may report the exit.
                    match table.remove(handle) {
                        Some(_) => {
                            info!(handle, %exit, "wait observed termination");
                            WaitOutcome::Exited(exit)
                        }
                        None => {
                            debug!(handle, "entry consumed by a concurrent wait");
                            WaitOutcome::NoSuchProcess
                        }
                    }
                }
                // Sender dropped: the entry was consumed by a concurrent
                // wait or by shutdown. Same as never having existed.
                Err(_) => {
                    debug!(handle, "entry consumed while waiting");
                    WaitOutcome::NoSuchProcess
                }
            }
        }

        peeked = reader.fill_buf() => {
            match peeked {
                Ok([]) | Err(_) => {
                    info!(handle, detach, "client gone mid-wait");
                    if !detach {
                        // Keep the process running and the entry waitable;
                        // the sweep forgets it a bounded time after exit.
                        table.mark_orphaned(handle);
                    }
                    WaitOutcome::ClientGone
                }
                Ok(_) => {
                    debug!(handle, "unexpected data during wait");
                    WaitOutcome::UnexpectedInput
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncWriteExt, BufReader};

    use super::*;
    use crate::proc::table::ProcessTable;

    // An open duplex stream stands in for a connected, silent client.
    fn silent_client() -> (BufReader<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(64);
        (BufReader::new(server), client)
    }

    #[tokio::test]
    async fn unknown_handle_is_immediate() {
        let table = ProcessTable::new();
        let (mut reader, _client) = silent_client();
        assert_eq!(wait(&mut reader, 99, &table).await, WaitOutcome::NoSuchProcess);
    }

    #[tokio::test]
    async fn already_exited_returns_without_blocking() {
        let table = ProcessTable::new();
        let h = table.insert(Some(1), false);
        table.record_exit(h, ExitKind::Code(3));

        let (mut reader, _client) = silent_client();
        let outcome = tokio::time::timeout(Duration::from_secs(1), wait(&mut reader, h, &table))
            .await
            .expect("wait must not block on a latched exit");
        assert_eq!(outcome, WaitOutcome::Exited(ExitKind::Code(3)));

        // Handle is consumed.
        assert_eq!(wait(&mut reader, h, &table).await, WaitOutcome::NoSuchProcess);
    }

    #[tokio::test]
    async fn exit_during_wait_wakes_the_waiter() {
        let table = Arc::new(ProcessTable::new());
        let h = table.insert(None, false);

        let (mut reader, _client) = silent_client();
        let t = Arc::clone(&table);
        let latch = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            t.record_exit(h, ExitKind::Signal(9));
        });

        let outcome = wait(&mut reader, h, &table).await;
        assert_eq!(outcome, WaitOutcome::Exited(ExitKind::Signal(9)));
        latch.await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_orphans_non_detached_entry() {
        let table = ProcessTable::new();
        let h = table.insert(None, false);

        let (mut reader, client) = silent_client();
        drop(client);

        assert_eq!(wait(&mut reader, h, &table).await, WaitOutcome::ClientGone);

        // Entry survives (still waitable) and the process was not touched.
        assert!(table.subscribe(h).is_some());

        // Once it exits, it is sweepable.
        table.record_exit(h, ExitKind::Code(0));
        assert_eq!(table.sweep(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn disconnect_leaves_detached_entry_untouched() {
        let table = ProcessTable::new();
        let h = table.insert(None, true);

        let (mut reader, client) = silent_client();
        drop(client);

        assert_eq!(wait(&mut reader, h, &table).await, WaitOutcome::ClientGone);
        assert!(table.subscribe(h).is_some());

        // Not orphaned: the sweep never collects it.
        table.record_exit(h, ExitKind::Code(0));
        assert_eq!(table.sweep(Duration::ZERO), 0);

        // A later wait from a fresh connection still observes the exit.
        let (mut reader2, _client2) = silent_client();
        assert_eq!(
            wait(&mut reader2, h, &table).await,
            WaitOutcome::Exited(ExitKind::Code(0))
        );
    }

    #[tokio::test]
    async fn concurrent_waits_consume_the_handle_exactly_once() {
        let table = Arc::new(ProcessTable::new());
        let h = table.insert(None, false);

        let spawn_waiter = |table: Arc<ProcessTable>| {
            tokio::spawn(async move {
                let (mut reader, _client) = silent_client();
                wait(&mut reader, h, &table).await
            })
        };
        let first = spawn_waiter(Arc::clone(&table));
        let second = spawn_waiter(Arc::clone(&table));

        // Let both waiters settle into their select before the exit lands.
        tokio::time::sleep(Duration::from_millis(50)).await;
        table.record_exit(h, ExitKind::Code(0));

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let successes = outcomes
            .iter()
            .filter(|o| matches!(o, WaitOutcome::Exited(_)))
            .count();
        assert_eq!(successes, 1, "handle consumed twice: {outcomes:?}");
        assert!(outcomes.contains(&WaitOutcome::Exited(ExitKind::Code(0))));
        assert!(outcomes.contains(&WaitOutcome::NoSuchProcess));
        assert!(table.subscribe(h).is_none());
    }

    #[tokio::test]
    async fn data_during_wait_is_a_framing_violation() {
        let table = ProcessTable::new();
        let h = table.insert(None, false);

        let (mut reader, mut client) = silent_client();
        client.write_all(b"garbage").await.unwrap();

        assert_eq!(wait(&mut reader, h, &table).await, WaitOutcome::UnexpectedInput);
        // Entry is left alone; it was not consumed.
        assert!(table.subscribe(h).is_some());
    }
}
