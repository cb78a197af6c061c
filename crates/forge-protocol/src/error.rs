//! Error types for the command protocol
//!
//! - [`ParseError`]: a complete envelope whose payload cannot be typed.
//!   Recoverable; the session logs it and moves on.
//! - [`ScanError`]: the stream itself cannot be scanned further. Fatal to the
//!   session, never to the process.

use crate::marker::CommandKind;
use serde::{Deserialize, Serialize};

/// Payload could not be turned into a typed command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    /// `[CREATE]`, `[EDIT]` or `[DELETE]` without a path
    #[error("{command} command has no path")]
    MissingPath { command: CommandKind },

    /// `[INSTALL]` with no package names
    #[error("install command lists no packages")]
    EmptyInstallList,

    /// Path token that does not name a file inside the workspace
    #[error("invalid path {raw:?}: {reason}")]
    InvalidPath { raw: String, reason: String },

    /// `action:` attribute with an unsupported value
    #[error("unknown edit action {action:?}")]
    UnknownEditAction { action: String },

    /// Missing or malformed `lines:` range for `modify-lines`
    #[error("invalid line range {raw:?}")]
    InvalidLineRange { raw: String },
}

/// Scanner cannot accept more input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanError {
    /// A single command payload outgrew the configured cap
    #[error("{command} payload exceeds {limit} bytes")]
    PayloadTooLarge { command: CommandKind, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_command() {
        let err = ParseError::MissingPath {
            command: CommandKind::Delete,
        };
        assert_eq!(err.to_string(), "DELETE command has no path");

        let err = ScanError::PayloadTooLarge {
            command: CommandKind::Create,
            limit: 16,
        };
        assert_eq!(err.to_string(), "CREATE payload exceeds 16 bytes");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(ParseError::UnknownEditAction {
            action: "patch".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "unknown_edit_action");
        assert_eq!(json["action"], "patch");
    }
}
