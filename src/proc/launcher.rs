// src/proc/launcher.rs

//! Process launcher.
//!
//! Starts a command in the background with the requested stream redirections,
//! registers it in the [`ProcessTable`], and returns the fresh handle
//! immediately. A reaper task is spawned per child; it awaits the OS exit
//! and latches the result into the table so a wait that arrives after the
//! exit still observes it without blocking.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::proc::table::ProcessTable;
use crate::types::{ExitKind, ProcessHandle, RedirectSpec, Redirects};

/// A fully-described launch request.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Program plus arguments; must be non-empty.
    pub argv: Vec<String>,
    /// Fire-and-forget: the process and its reportability outlive any client.
    pub detach: bool,
    pub redirects: Redirects,
}

/// Trait abstracting how launch requests are executed.
///
/// Production code uses [`RealLauncher`]; tests can provide their own
/// implementation that registers table entries without spawning OS
/// processes.
pub trait LauncherBackend: Send + Sync {
    /// Start the process described by `spec` and return its handle.
    ///
    /// On error no table entry exists and any partially-opened redirection
    /// files have been dropped.
    fn launch(
        &self,
        spec: LaunchSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessHandle, AgentError>> + Send + '_>>;
}

/// Real launcher used in production: spawns via `tokio::process::Command`.
pub struct RealLauncher {
    table: Arc<ProcessTable>,
}

impl RealLauncher {
    pub fn new(table: Arc<ProcessTable>) -> Self {
        Self { table }
    }
}

impl LauncherBackend for RealLauncher {
    fn launch(
        &self,
        spec: LaunchSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessHandle, AgentError>> + Send + '_>> {
        let table = Arc::clone(&self.table);
        Box::pin(async move { launch_process(&table, spec).await })
    }
}

/// Open one redirection endpoint in the mode required by its stream.
///
/// `read` selects open-for-read (stdin) vs create/truncate-for-write
/// (stdout, stderr).
async fn open_redirect(spec: &RedirectSpec, read: bool) -> std::io::Result<Stdio> {
    match spec {
        RedirectSpec::Inherit => Ok(Stdio::inherit()),
        RedirectSpec::Discard => Ok(Stdio::null()),
        RedirectSpec::Path(path) => {
            let file = if read {
                tokio::fs::File::open(path).await?
            } else {
                tokio::fs::File::create(path).await?
            };
            Ok(file.into_std().await.into())
        }
    }
}

/// Launch a process and commit its table entry.
///
/// The entry is committed before the handle is returned, so no caller can
/// observe a handle that is not yet lookup-able.
pub async fn launch_process(
    table: &Arc<ProcessTable>,
    spec: LaunchSpec,
) -> Result<ProcessHandle, AgentError> {
    let Some(program) = spec.argv.first().cloned() else {
        return Err(AgentError::Launch {
            program: String::new(),
            reason: "empty argument vector".to_string(),
        });
    };

    let launch_err = |reason: String| AgentError::Launch {
        program: program.clone(),
        reason,
    };

    // Open redirection targets first; any failure aborts the launch before a
    // process or table entry exists. Files opened so far are dropped here.
    let stdin = open_redirect(&spec.redirects.stdin, true)
        .await
        .map_err(|e| launch_err(format!("cannot open stdin redirect: {e}")))?;
    let stdout = open_redirect(&spec.redirects.stdout, false)
        .await
        .map_err(|e| launch_err(format!("cannot open stdout redirect: {e}")))?;
    let stderr = open_redirect(&spec.redirects.stderr, false)
        .await
        .map_err(|e| launch_err(format!("cannot open stderr redirect: {e}")))?;

    let mut cmd = Command::new(&program);
    cmd.args(&spec.argv[1..])
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr)
        // A background process is never killed because the daemon dropped
        // its Child; it must survive client and wait lifetimes.
        .kill_on_drop(false);

    let mut child = cmd.spawn().map_err(|e| launch_err(e.to_string()))?;
    let pid = child.id();

    let handle = table.insert(pid, spec.detach);
    info!(handle, ?pid, program = %program, detach = spec.detach, "process launched");

    spawn_reaper(Arc::clone(table), handle, child);

    Ok(handle)
}

/// Spawn the per-child reaper task.
///
/// It owns the `Child`, awaits its termination, and latches the exit into
/// the table. This is the single point where the OS process resource is
/// released.
fn spawn_reaper(table: Arc<ProcessTable>, handle: ProcessHandle, mut child: tokio::process::Child) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                let exit = ExitKind::from_exit_status(status);
                debug!(handle, %exit, "reaper observed termination");
                table.record_exit(handle, exit);
            }
            Err(e) => {
                // wait() on a spawned child should not fail; latch a fault
                // so a pending waiter is not left blocking forever.
                warn!(handle, error = %e, "reaper failed to wait on child");
                table.record_exit(handle, ExitKind::Signal(-1));
            }
        }
    });
}
