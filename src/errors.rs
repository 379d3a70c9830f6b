// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::ProcessHandle;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("No such process: {0}")]
    NoSuchProcess(ProcessHandle),

    #[error("Cannot resolve {host}:{service}: {reason}")]
    Resolve {
        host: String,
        service: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentError>;
