// src/proc/mod.rs

//! Background-process tracking core.
//!
//! This module owns the run-and-wait machinery:
//! - [`table`] is the process-wide registry keyed by opaque handle.
//! - [`launcher`] starts commands with redirections and spawns the per-child
//!   reaper, behind the [`LauncherBackend`] seam so tests can substitute a
//!   fake that never touches the OS.
//! - [`waiter`] performs the dual-source blocking wait (process exit vs.
//!   client disconnect).

pub mod launcher;
pub mod table;
pub mod waiter;

pub use launcher::{LaunchSpec, LauncherBackend, RealLauncher, launch_process};
pub use table::{ProcState, ProcessEntry, ProcessTable, WaitTicket};
pub use waiter::{WaitOutcome, wait};
