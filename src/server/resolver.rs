// src/server/resolver.rs

//! Address resolution.
//!
//! Thin wrapper over `tokio::net::lookup_host`: a host/service pair goes in,
//! a list of bindable socket addresses comes out. Owns no state; the caller
//! tries the addresses in order until one binds.

use std::net::SocketAddr;

use crate::errors::AgentError;

/// Resolve `host:service` to the candidate socket addresses.
pub async fn resolve(host: &str, service: &str) -> Result<Vec<SocketAddr>, AgentError> {
    let target = format!("{host}:{service}");
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&target)
        .await
        .map_err(|e| AgentError::Resolve {
            host: host.to_string(),
            service: service.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(AgentError::Resolve {
            host: host.to_string(),
            service: service.to_string(),
            reason: "no addresses found".to_string(),
        });
    }

    Ok(addrs)
}
