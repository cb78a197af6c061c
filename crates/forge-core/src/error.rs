//! Error types for Forge Core
//!
//! Covers:
//! - Session finalization failures (transport, scanning, cancellation)
//! - Model client transport errors
//! - Build request validation
//! - Configuration loading
//!
//! Parse errors and file system conflicts are not here: a session records
//! them in its log and keeps going.

use forge_protocol::ScanError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reason a session was finalized in an error state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    /// Upstream fragment source failed
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// Scanner refused further input
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Caller cancelled the build
    #[error("session cancelled")]
    Cancelled,

    /// No fragment arrived within the idle timeout
    #[error("no fragment received for {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Input offered after the session was finalized
    #[error("session already finalized")]
    Finalized,
}

impl SessionError {
    /// Whether the caller ended the session rather than the stream failing
    #[inline]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SessionError::Cancelled | SessionError::Timeout { .. })
    }
}

/// Failure delivering model output
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransportError {
    /// Could not reach the provider
    #[error("connection failed: {0}")]
    Connection(String),

    /// Provider answered with an error
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Stream broke off mid-response
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

/// Build request could not be started
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Request text is empty or blank
    #[error("request is required")]
    EmptyRequest,

    /// Model client could not open a stream
    #[error("model client failed: {0}")]
    Client(#[from] TransportError),
}

/// Configuration could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`BuildConfig`](crate::BuildConfig)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override has an unusable value
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    /// Value out of range
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_protocol::CommandKind;

    #[test]
    fn session_error_wraps_sources() {
        let err: SessionError = TransportError::Interrupted("reset".into()).into();
        assert_eq!(err.to_string(), "transport failed: stream interrupted: reset");

        let err: SessionError = ScanError::PayloadTooLarge {
            command: CommandKind::Create,
            limit: 4,
        }
        .into();
        assert!(!err.is_cancellation());
        assert!(SessionError::Timeout { duration_secs: 3 }.is_cancellation());
    }

    #[test]
    fn session_error_serializes() {
        let json = serde_json::to_value(SessionError::Cancelled).unwrap();
        assert_eq!(json["kind"], "cancelled");
    }
}
