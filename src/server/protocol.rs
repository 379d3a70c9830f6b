// src/server/protocol.rs

//! Wire schema: newline-delimited JSON, one request line in, one response
//! line out.
//!
//! Requests:
//! - `{"op":"run","argv":["/bin/true"],"detach":false,"redirects":{...}}`
//! - `{"op":"wait","handle":7}`
//!
//! Responses always carry the numeric status triple (`code`: 0 ok, 1 error,
//! 2 fatal) and a human-readable message; `run` adds the allocated handle,
//! a successful `wait` adds the tagged exit value.

use serde::{Deserialize, Serialize};

use crate::status::StatusCode;
use crate::types::{ExitKind, ProcessHandle, Redirects};

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Run {
        argv: Vec<String>,
        #[serde(default)]
        detach: bool,
        #[serde(default)]
        redirects: Redirects,
    },
    Wait {
        handle: ProcessHandle,
    },
}

/// The single framed response to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: StatusCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<ProcessHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitKind>,
}

impl Response {
    pub fn ok(
        message: impl Into<String>,
        handle: Option<ProcessHandle>,
        exit: Option<ExitKind>,
    ) -> Self {
        Self {
            code: StatusCode::Ok,
            message: message.into(),
            handle,
            exit,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: message.into(),
            handle: None,
            exit: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Fatal,
            message: message.into(),
            handle: None,
            exit: None,
        }
    }
}
