use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use runnerd::errors::AgentError;
use runnerd::proc::{LaunchSpec, LauncherBackend, ProcessTable};
use runnerd::types::{ExitKind, ProcessHandle};

/// A fake launcher that:
/// - records every spec it was asked to launch
/// - registers a `Running` table entry without spawning any OS process.
///
/// Tests drive completion with [`FakeLauncher::finish`], which plays the
/// role of the per-child reaper.
pub struct FakeLauncher {
    table: Arc<ProcessTable>,
    launched: Arc<Mutex<Vec<LaunchSpec>>>,
    fail_reason: Mutex<Option<String>>,
}

impl FakeLauncher {
    pub fn new(table: Arc<ProcessTable>) -> Self {
        Self {
            table,
            launched: Arc::new(Mutex::new(Vec::new())),
            fail_reason: Mutex::new(None),
        }
    }

    /// Make every subsequent launch fail with the given reason.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_reason.lock().unwrap() = Some(reason.into());
    }

    /// Specs launched so far, in order.
    pub fn launched(&self) -> Vec<LaunchSpec> {
        self.launched.lock().unwrap().clone()
    }

    /// Latch an exit for a fake process, as the reaper would.
    pub fn finish(&self, handle: ProcessHandle, exit: ExitKind) {
        self.table.record_exit(handle, exit);
    }
}

impl LauncherBackend for FakeLauncher {
    fn launch(
        &self,
        spec: LaunchSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessHandle, AgentError>> + Send + '_>> {
        let table = Arc::clone(&self.table);
        let launched = Arc::clone(&self.launched);
        let fail = self.fail_reason.lock().unwrap().clone();

        Box::pin(async move {
            if let Some(reason) = fail {
                return Err(AgentError::Launch {
                    program: spec.argv.first().cloned().unwrap_or_default(),
                    reason,
                });
            }

            let detach = spec.detach;
            launched.lock().unwrap().push(spec);
            Ok(table.insert(None, detach))
        })
    }
}
