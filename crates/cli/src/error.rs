//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration failed to load or validate
    #[error("Invalid configuration {path}: {source}")]
    InvalidConfig {
        path: String,
        #[source]
        source: ContractError,
    },

    /// Could not reach a streamer
    #[error("Failed to connect to streamer at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Signal handler installation failed
    #[error("Failed to install {signal} handler: {source}")]
    Signal {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_config(path: impl Into<String>, source: ContractError) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            source,
        }
    }

    pub fn connect(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            addr: addr.into(),
            source,
        }
    }

    pub fn signal(signal: &'static str, source: std::io::Error) -> Self {
        Self::Signal { signal, source }
    }
}
