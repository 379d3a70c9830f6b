use std::path::PathBuf;

use runnerd::proc::LaunchSpec;
use runnerd::types::{RedirectSpec, Redirects};

/// Builder for [`LaunchSpec`] values in tests.
#[derive(Debug, Clone)]
pub struct LaunchSpecBuilder {
    argv: Vec<String>,
    detach: bool,
    redirects: Redirects,
}

impl LaunchSpecBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            detach: false,
            redirects: Redirects::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn detach(mut self) -> Self {
        self.detach = true;
        self
    }

    pub fn stdin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.redirects.stdin = RedirectSpec::Path(path.into());
        self
    }

    pub fn stdout_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.redirects.stdout = RedirectSpec::Path(path.into());
        self
    }

    pub fn stderr_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.redirects.stderr = RedirectSpec::Path(path.into());
        self
    }

    pub fn discard_output(mut self) -> Self {
        self.redirects.stdout = RedirectSpec::Discard;
        self.redirects.stderr = RedirectSpec::Discard;
        self
    }

    pub fn build(self) -> LaunchSpec {
        LaunchSpec {
            argv: self.argv,
            detach: self.detach,
            redirects: self.redirects,
        }
    }
}

/// JSON request line for a `run` operation, as a client would send it.
pub fn run_request_json(argv: &[&str], detach: bool) -> serde_json::Value {
    serde_json::json!({ "op": "run", "argv": argv, "detach": detach })
}

/// JSON request line for a `wait` operation.
pub fn wait_request_json(handle: u64) -> serde_json::Value {
    serde_json::json!({ "op": "wait", "handle": handle })
}
