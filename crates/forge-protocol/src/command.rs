//! Typed build commands and the envelopes they are parsed from

use crate::marker::CommandKind;
use forge_vfs::WorkspacePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A recognized command whose payload has not been typed yet
///
/// `span` is the absolute byte range in the logical stream, from the start of
/// the marker line to the end of the payload. `complete` is false only for the
/// scanner's provisional peek; envelopes handed to the parser are complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub kind: CommandKind,
    pub payload: String,
    pub span: Range<usize>,
    pub complete: bool,
}

impl CommandEnvelope {
    /// Payload size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// How an `[EDIT]` changes its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum EditAction {
    /// Replace the whole file
    #[default]
    Replace,
    /// Add to the end of the file
    Append,
    /// Replace lines `start..=end` (1-based)
    ModifyLines { start: usize, end: usize },
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditAction::Replace => f.write_str("replace"),
            EditAction::Append => f.write_str("append"),
            EditAction::ModifyLines { start, end } => write!(f, "modify-lines {start}-{end}"),
        }
    }
}

/// A typed, validated build command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Thought {
        note: String,
    },
    Create {
        path: WorkspacePath,
        content: String,
    },
    Edit {
        path: WorkspacePath,
        content: String,
        #[serde(default)]
        action: EditAction,
    },
    Delete {
        path: WorkspacePath,
    },
    Install {
        packages: Vec<String>,
    },
    Complete {
        note: String,
    },
}

impl Command {
    /// Marker kind of this command
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Thought { .. } => CommandKind::Thought,
            Command::Create { .. } => CommandKind::Create,
            Command::Edit { .. } => CommandKind::Edit,
            Command::Delete { .. } => CommandKind::Delete,
            Command::Install { .. } => CommandKind::Install,
            Command::Complete { .. } => CommandKind::Complete,
        }
    }

    /// Target path for tree-mutating commands
    #[must_use]
    pub fn path(&self) -> Option<&WorkspacePath> {
        match self {
            Command::Create { path, .. } | Command::Edit { path, .. } | Command::Delete { path } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Whether this command ends the session
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Thought { note } | Command::Complete { note } => {
                write!(f, "{} {}", self.kind(), note.lines().next().unwrap_or_default())
            }
            Command::Create { path, content } => {
                write!(f, "CREATE {path} ({} bytes)", content.len())
            }
            Command::Edit {
                path,
                content,
                action,
            } => write!(f, "EDIT {path} {action} ({} bytes)", content.len()),
            Command::Delete { path } => write!(f, "DELETE {path}"),
            Command::Install { packages } => write!(f, "INSTALL {}", packages.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> WorkspacePath {
        WorkspacePath::parse(s).unwrap()
    }

    #[test]
    fn kind_and_path() {
        let cmd = Command::Delete { path: p("/a") };
        assert_eq!(cmd.kind(), CommandKind::Delete);
        assert_eq!(cmd.path(), Some(&p("/a")));
        assert!(Command::Install { packages: vec![] }.path().is_none());
    }

    #[test]
    fn display_summaries() {
        let cmd = Command::Edit {
            path: p("/App.tsx"),
            content: "abc".into(),
            action: EditAction::ModifyLines { start: 2, end: 4 },
        };
        assert_eq!(cmd.to_string(), "EDIT /App.tsx modify-lines 2-4 (3 bytes)");
        let cmd = Command::Thought {
            note: "first line\nsecond".into(),
        };
        assert_eq!(cmd.to_string(), "THOUGHT first line");
    }

    #[test]
    fn serde_shape() {
        let cmd = Command::Install {
            packages: vec!["left-pad".into(), "react".into()],
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "install");
        assert_eq!(json["packages"][1], "react");

        let edit: Command = serde_json::from_str(
            r#"{"type":"edit","path":"/a.txt","content":"x"}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            Command::Edit {
                path: p("/a.txt"),
                content: "x".into(),
                action: EditAction::Replace,
            }
        );
    }
}
