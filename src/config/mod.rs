// src/config/mod.rs

//! Daemon configuration: TOML schema, loading and validation.

pub mod loader;
pub mod model;

pub use loader::{load_and_validate, load_or_default};
pub use model::{ConfigFile, ServerConfig, SweepConfig};
