// src/server/mod.rs

//! TCP front end.
//!
//! - [`resolver`] turns the configured host/service pair into bindable
//!   addresses.
//! - [`Server`] binds the first workable address, accepts connections, and
//!   spawns one [`connection`] task per client plus the periodic orphan
//!   sweep. Ctrl-C stops the accept loop and drains the table.
//! - [`protocol`] holds the serde request/response types.

pub mod connection;
pub mod protocol;
pub mod resolver;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::SweepConfig;
use crate::errors::Result;
use crate::proc::{LauncherBackend, ProcessTable, RealLauncher};

pub struct Server {
    listener: TcpListener,
    table: Arc<ProcessTable>,
    launcher: Arc<dyn LauncherBackend>,
    sweep: SweepConfig,
}

impl Server {
    /// Resolve `host:service` and bind the first address that accepts it.
    pub async fn bind(host: &str, service: &str, sweep: SweepConfig) -> Result<Self> {
        let addrs = resolver::resolve(host, service).await?;

        let mut last_err = None;
        let mut listener = None;
        for addr in addrs {
            match TcpListener::bind(addr).await {
                Ok(l) => {
                    listener = Some(l);
                    break;
                }
                Err(e) => {
                    debug!(%addr, error = %e, "bind failed; trying next address");
                    last_err = Some(e);
                }
            }
        }

        let listener = match (listener, last_err) {
            (Some(l), _) => l,
            (None, Some(e)) => return Err(e.into()),
            (None, None) => unreachable!("resolver returned a non-empty list"),
        };

        let table = Arc::new(ProcessTable::new());
        let launcher: Arc<dyn LauncherBackend> = Arc::new(RealLauncher::new(Arc::clone(&table)));

        Ok(Self {
            listener,
            table,
            launcher,
            sweep,
        })
    }

    /// The address actually bound (useful when the service was "0").
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared table, for tests that inspect daemon state from outside.
    pub fn table(&self) -> Arc<ProcessTable> {
        Arc::clone(&self.table)
    }

    /// Accept loop. Runs until Ctrl-C, then drains the table and returns.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "runnerd listening");

        let sweeper = spawn_sweeper(Arc::clone(&self.table), self.sweep);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let table = Arc::clone(&self.table);
                            let launcher = Arc::clone(&self.launcher);
                            tokio::spawn(async move {
                                connection::serve_connection(stream, table, launcher).await;
                            });
                        }
                        // An isolated accept failure never takes the daemon
                        // down; log and keep accepting.
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        sweeper.abort();
        self.table.shutdown_drain();
        info!("runnerd stopped");
        Ok(())
    }
}

/// Periodic sweep of orphaned entries whose process has exited.
fn spawn_sweeper(table: Arc<ProcessTable>, sweep: SweepConfig) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(sweep.interval_secs);
    let ttl = Duration::from_secs(sweep.orphan_ttl_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = table.sweep(ttl);
            if removed > 0 {
                debug!(removed, "sweep collected orphaned entries");
            }
        }
    })
}
