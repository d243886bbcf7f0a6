//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `ledlink` binary)

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LedError, Result};
use crate::transport::DEFAULT_MAX_LINE_BYTES;

/// Default LED host port
pub const DEFAULT_PORT: u16 = 5729;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// LED host connection
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            LedError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        toml::from_str(&content).map_err(|e| LedError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("LEDHOST_HOST") {
            config.connection.host = host;
        }
        if let Ok(port) = std::env::var("LEDHOST_PORT") {
            match port.parse() {
                Ok(port) => config.connection.port = port,
                Err(_) => tracing::warn!("Ignoring LEDHOST_PORT={port}: not a port number"),
            }
        }
        if let Ok(ms) = std::env::var("LEDHOST_POLL_TIMEOUT_MS") {
            match ms.parse() {
                Ok(ms) => config.connection.poll_timeout_ms = Some(ms),
                Err(_) => tracing::warn!("Ignoring LEDHOST_POLL_TIMEOUT_MS={ms}"),
            }
        }

        config
    }

    /// Merge with another config (other takes precedence where it differs
    /// from the defaults)
    pub fn merge(self, other: Self) -> Self {
        let defaults = ConnectionConfig::default();
        let (base, over) = (self.connection, other.connection);
        Self {
            connection: ConnectionConfig {
                host: if over.host != defaults.host {
                    over.host
                } else {
                    base.host
                },
                port: if over.port != defaults.port {
                    over.port
                } else {
                    base.port
                },
                poll_timeout_ms: over.poll_timeout_ms.or(base.poll_timeout_ms),
                read_chunk: if over.read_chunk != defaults.read_chunk {
                    over.read_chunk
                } else {
                    base.read_chunk
                },
                max_line_bytes: if over.max_line_bytes != defaults.max_line_bytes {
                    over.max_line_bytes
                } else {
                    base.max_line_bytes
                },
            },
        }
    }

    /// `<config dir>/ledlink/config.toml`, when the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ledlink").join("config.toml"))
    }
}

/// LED host connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host name or address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Readiness wait bound in milliseconds; unset waits indefinitely
    pub poll_timeout_ms: Option<u64>,

    /// Bytes requested per read
    pub read_chunk: usize,

    /// Longest unterminated line kept before it is discarded
    pub max_line_bytes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            poll_timeout_ms: None,
            read_chunk: 1024,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl ConnectionConfig {
    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Readiness wait bound
    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }
}
