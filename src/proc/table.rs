// src/proc/table.rs

//! Process-wide registry of background processes.
//!
//! The table maps an opaque [`ProcessHandle`] to the live state of one
//! background process. It is the only shared mutable structure in the
//! daemon: every connection task holds an `Arc<ProcessTable>` injected at
//! startup.
//!
//! Lifecycle of an entry:
//! - created by the launcher (`insert`), state `Running`;
//! - flipped to `Exited` by the reaper task once `child.wait()` resolves
//!   (`record_exit`), which latches the exit so a later wait returns
//!   immediately;
//! - consumed by the first successful wait (`remove`), after which the handle
//!   is invalid forever;
//! - or, for orphaned entries (non-detached launcher connection went away
//!   mid-wait), collected by the periodic sweep once the process has exited
//!   and the TTL has elapsed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::types::{ExitKind, ProcessHandle};

/// Latched state of one tracked process. Transitions only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Exited(ExitKind),
}

/// One live or recently-finished background process.
#[derive(Debug)]
pub struct ProcessEntry {
    pub handle: ProcessHandle,
    /// OS pid, for logging and status messages only; never used for lookup.
    pub pid: Option<u32>,
    /// Fire-and-forget mode: lifetime independent of any client connection.
    pub detach: bool,
    /// Set when a non-detached waiter's client disconnected mid-wait.
    /// Orphaned entries are collected by the sweep after they exit.
    pub orphaned: bool,
    /// When the exit was recorded; drives the sweep TTL.
    exited_at: Option<Instant>,
    state_tx: watch::Sender<ProcState>,
}

/// Read-side view of an entry handed to a waiter.
#[derive(Debug)]
pub struct WaitTicket {
    pub state_rx: watch::Receiver<ProcState>,
    pub detach: bool,
    pub pid: Option<u32>,
}

#[derive(Debug, Default)]
pub struct ProcessTable {
    entries: Mutex<HashMap<ProcessHandle, ProcessEntry>>,
    // Monotonic; handle 0 is never allocated.
    next_handle: AtomicU64,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh handle and store a `Running` entry for it.
    ///
    /// The entry is lookup-able before this returns, so a handle observed by
    /// a client is always valid for an immediate wait.
    pub fn insert(&self, pid: Option<u32>, detach: bool) -> ProcessHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        let (state_tx, _) = watch::channel(ProcState::Running);

        let entry = ProcessEntry {
            handle,
            pid,
            detach,
            orphaned: false,
            exited_at: None,
            state_tx,
        };

        let mut entries = self.entries.lock().expect("process table poisoned");
        let previous = entries.insert(handle, entry);
        debug_assert!(previous.is_none(), "handle {handle} allocated twice");

        debug!(handle, ?pid, detach, "process registered");
        handle
    }

    /// Read-only probe: subscribe to the entry's state without consuming it.
    pub fn subscribe(&self, handle: ProcessHandle) -> Option<WaitTicket> {
        let entries = self.entries.lock().expect("process table poisoned");
        entries.get(&handle).map(|entry| WaitTicket {
            state_rx: entry.state_tx.subscribe(),
            detach: entry.detach,
            pid: entry.pid,
        })
    }

    /// Latch the exit of a tracked process. Called by the reaper task; a
    /// no-op if the entry was already removed.
    pub fn record_exit(&self, handle: ProcessHandle, exit: ExitKind) {
        let mut entries = self.entries.lock().expect("process table poisoned");
        if let Some(entry) = entries.get_mut(&handle) {
            entry.exited_at = Some(Instant::now());
            entry.state_tx.send_replace(ProcState::Exited(exit));
            debug!(handle, %exit, "exit latched");
        }
    }

    /// Delete the entry. Idempotent: removing an unknown handle is a no-op.
    pub fn remove(&self, handle: ProcessHandle) -> Option<ProcessEntry> {
        let mut entries = self.entries.lock().expect("process table poisoned");
        entries.remove(&handle)
    }

    /// Mark an entry as orphaned so the sweep can collect it after exit.
    pub fn mark_orphaned(&self, handle: ProcessHandle) {
        let mut entries = self.entries.lock().expect("process table poisoned");
        if let Some(entry) = entries.get_mut(&handle) {
            entry.orphaned = true;
            debug!(handle, "entry orphaned");
        }
    }

    /// Collect orphaned entries whose process exited at least `ttl` ago.
    ///
    /// This is the garbage-collection policy for processes whose launching
    /// client disconnected without the detach flag: they keep running, remain
    /// waitable, and are forgotten a bounded time after they exit.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.lock().expect("process table poisoned");
        let before = entries.len();
        entries.retain(|handle, entry| {
            let expired = entry.orphaned
                && entry
                    .exited_at
                    .is_some_and(|at| at.elapsed() >= ttl);
            if expired {
                info!(handle, "sweeping orphaned entry");
            }
            !expired
        });
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("process table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry at daemon shutdown. Processes that were never waited
    /// on are released implicitly; nothing is killed.
    pub fn shutdown_drain(&self) -> usize {
        let mut entries = self.entries.lock().expect("process table poisoned");
        let count = entries.len();
        if count > 0 {
            info!(count, "releasing unwaited entries at shutdown");
        }
        entries.clear();
        count
    }
}
