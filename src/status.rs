// src/status.rs

//! Three-level status reporting.
//!
//! Every request ends in exactly one status written back to the client:
//! - `Ok` (0): the request succeeded.
//! - `Error` (1): the request failed but the connection is still usable.
//! - `Fatal` (2): the connection's integrity is compromised; the caller must
//!   drop the connection after sending this.
//!
//! The numeric triple {0, 1, 2} is part of the wire contract and must never
//! change. Single emission per request is enforced by construction: a
//! [`ReportSlot`] is created per request and consumed (moved) by the one call
//! that writes the response.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::server::protocol::Response;

/// Severity of a status report. Wire-stable numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StatusCode {
    Ok = 0,
    Error = 1,
    Fatal = 2,
}

impl From<StatusCode> for u8 {
    fn from(code: StatusCode) -> u8 {
        code as u8
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(StatusCode::Ok),
            1 => Ok(StatusCode::Error),
            2 => Ok(StatusCode::Fatal),
            other => Err(format!("invalid status code: {other}")),
        }
    }
}

/// Single-assignment result slot for one request.
///
/// The connection loop creates one slot per parsed request and hands it to
/// the dispatch path. `fill` takes the slot by value, so a second report for
/// the same request does not compile in a linear flow. Dropping the slot
/// without filling it is the `ClientGone` case: the peer is gone, nothing is
/// written.
pub struct ReportSlot<'a, W: AsyncWrite + Unpin> {
    writer: &'a mut W,
}

impl<'a, W: AsyncWrite + Unpin> ReportSlot<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    /// Write the response as one JSON line and consume the slot.
    pub async fn fill(self, response: &Response) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(response).map_err(std::io::Error::other)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await
    }
}
