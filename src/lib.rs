// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod proc;
pub mod server;
pub mod status;
pub mod types;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::server::Server;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + CLI overrides)
/// - the process table, launcher, and orphan sweep
/// - the TCP accept loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let server = Server::bind(&cfg.server.host, &cfg.server.port, cfg.sweep).await?;
    info!(addr = %server.local_addr()?, "bound");

    server.run().await?;
    Ok(())
}

/// Merge the config file (or defaults) with CLI overrides.
fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = load_or_default(&args.config)?;

    if let Some(host) = &args.host {
        cfg.server.host = host.clone();
    }
    if let Some(port) = &args.port {
        cfg.server.port = port.clone();
    }

    Ok(cfg)
}

/// Simple dry-run output: print the resolved settings.
fn print_dry_run(cfg: &ConfigFile) {
    println!("runnerd dry-run");
    println!("  server.host = {}", cfg.server.host);
    println!("  server.port = {}", cfg.server.port);
    println!("  sweep.interval_secs = {}", cfg.sweep.interval_secs);
    println!("  sweep.orphan_ttl_secs = {}", cfg.sweep.orphan_ttl_secs);
}
