// src/config/model.rs

//! Config file schema.
//!
//! `RawConfigFile` is the shape `toml` deserializes into; `ConfigFile` is the
//! validated form the rest of the daemon consumes. The split keeps serde
//! defaults separate from semantic validation.

use serde::Deserialize;

use crate::errors::AgentError;

/// Default listen service. Matches the port test-orchestration clients are
/// configured with out of the box.
pub const DEFAULT_PORT: u16 = 4433;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
const DEFAULT_ORPHAN_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: RawServerConfig,
    #[serde(default)]
    pub sweep: RawSweepConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawServerConfig {
    /// Host or address to bind. Defaults to all interfaces.
    pub host: Option<String>,
    /// Service name or port number.
    pub port: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSweepConfig {
    pub interval_secs: Option<u64>,
    pub orphan_ttl_secs: Option<u64>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    pub interval_secs: u64,
    pub orphan_ttl_secs: u64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT.to_string(),
            },
            sweep: SweepConfig {
                interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
                orphan_ttl_secs: DEFAULT_ORPHAN_TTL_SECS,
            },
        }
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AgentError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        let defaults = ConfigFile::default();

        let interval_secs = raw
            .sweep
            .interval_secs
            .unwrap_or(defaults.sweep.interval_secs);
        if interval_secs == 0 {
            return Err(AgentError::ConfigError(
                "sweep.interval_secs must be at least 1".to_string(),
            ));
        }

        let orphan_ttl_secs = raw
            .sweep
            .orphan_ttl_secs
            .unwrap_or(defaults.sweep.orphan_ttl_secs);
        if orphan_ttl_secs == 0 {
            return Err(AgentError::ConfigError(
                "sweep.orphan_ttl_secs must be at least 1".to_string(),
            ));
        }

        let host = raw.server.host.unwrap_or(defaults.server.host);
        if host.is_empty() {
            return Err(AgentError::ConfigError(
                "server.host must not be empty".to_string(),
            ));
        }

        let port = raw.server.port.unwrap_or(defaults.server.port);
        if port.is_empty() {
            return Err(AgentError::ConfigError(
                "server.port must not be empty".to_string(),
            ));
        }

        Ok(ConfigFile {
            server: ServerConfig { host, port },
            sweep: SweepConfig {
                interval_secs,
                orphan_ttl_secs,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_raw_config_yields_defaults() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, DEFAULT_PORT.to_string());
        assert_eq!(cfg.sweep.interval_secs, DEFAULT_SWEEP_INTERVAL_SECS);
        assert_eq!(cfg.sweep.orphan_ttl_secs, DEFAULT_ORPHAN_TTL_SECS);
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let raw: RawConfigFile = toml::from_str("[sweep]\ninterval_secs = 0\n").unwrap();
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<RawConfigFile>("[server]\nqueue = 3\n").is_err());
    }

    #[test]
    fn full_config_parses() {
        let raw: RawConfigFile = toml::from_str(
            "[server]\nhost = \"127.0.0.1\"\nport = \"9000\"\n\
             [sweep]\ninterval_secs = 5\norphan_ttl_secs = 10\n",
        )
        .unwrap();
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, "9000");
        assert_eq!(cfg.sweep.interval_secs, 5);
        assert_eq!(cfg.sweep.orphan_ttl_secs, 10);
    }
}
