//! Error types for RPC-4 sessions.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from opening a session. Fatal to that attempt; retry `connect` from scratch.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The serial device could not be opened.
    #[error("cannot open {device}: {source}")]
    Open {
        /// Device path.
        device: String,
        /// Underlying serial port error.
        source: serialport::Error,
    },

    /// The unit never printed its command prompt.
    #[error("cannot connect to {device}: no command prompt within {timeout_ms} ms")]
    NoPrompt {
        /// Device path.
        device: String,
        /// Handshake timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The session config is unusable. Nothing was opened.
    #[error("cannot connect to {device}: {source}")]
    Config {
        /// Device path.
        device: String,
        /// What is wrong with the config.
        source: ConfigError,
    },

    /// The handshake could not be written or read.
    #[error("cannot connect to {device}: {source}")]
    Io {
        /// Device path.
        device: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl ConnectError {
    /// Device path of the failed attempt.
    pub fn device(&self) -> &str {
        match self {
            ConnectError::Open { device, .. }
            | ConnectError::NoPrompt { device, .. }
            | ConnectError::Config { device, .. }
            | ConnectError::Io { device, .. } => device,
        }
    }
}

/// Errors from exchanges on a session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session never connected or was already closed. No I/O was attempted.
    #[error("not connected")]
    NotConnected,

    /// The prompt did not arrive in time. The session position relative to the
    /// prompt is unknown; close and reconnect.
    #[error("timeout after {timeout_ms} ms waiting for command prompt ({received} bytes received)")]
    Timeout {
        /// Read timeout in milliseconds.
        timeout_ms: u64,
        /// Bytes buffered without a prompt.
        received: usize,
    },

    /// The transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Check whether the session should be considered unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Timeout { .. } | ClientError::Io(_))
    }
}

/// Errors from loading or checking a session config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The file is not valid YAML for a session config.
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No command prompt was configured; no response could ever be framed.
    #[error("command prompt must not be empty")]
    EmptyPrompt,
}

/// Result type alias for session operations.
pub type ClientResult<T> = Result<T, ClientError>;
