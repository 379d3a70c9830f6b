use std::path::PathBuf;
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a tracked background process.
///
/// Handles are allocated from a process-wide monotonic counter starting at 1
/// and are never reused for the lifetime of the daemon, so a recycled OS pid
/// can never alias an old handle. 0 is never a valid handle.
pub type ProcessHandle = u64;

/// What to do with one of the child's standard streams.
///
/// The launch request carries one of these for each of stdin, stdout and
/// stderr (in that order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectSpec {
    /// Inherit the daemon's own stream.
    #[default]
    Inherit,
    /// Attach the stream to the platform null device.
    Discard,
    /// Open the given path (read for stdin, create+truncate for stdout and
    /// stderr).
    Path(PathBuf),
}

/// Redirection triple for a launch request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirects {
    #[serde(default)]
    pub stdin: RedirectSpec,
    #[serde(default)]
    pub stdout: RedirectSpec,
    #[serde(default)]
    pub stderr: RedirectSpec,
}

/// How a tracked process finished.
///
/// A tagged value rather than a bare integer so "exited with code N" is never
/// conflated with "killed by signal K" across the two platform models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitKind {
    /// Terminated normally with the given exit code.
    Code(i32),
    /// Terminated by a signal / fault with the given number.
    Signal(i32),
}

impl ExitKind {
    /// Translate an OS exit status into the tagged wire form.
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitKind::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return ExitKind::Signal(sig);
            }
        }

        // Not observed in practice: on unix a code-less status carries a
        // signal, elsewhere a code is always present.
        ExitKind::Signal(-1)
    }
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitKind::Code(code) => write!(f, "exited with code {code}"),
            ExitKind::Signal(sig) if *sig >= 0 => write!(f, "terminated by signal {sig}"),
            // Negative numbers are the reaper's fault sentinel, not a real
            // signal; don't present them as one.
            ExitKind::Signal(_) => write!(f, "terminated by an unidentified fault"),
        }
    }
}
