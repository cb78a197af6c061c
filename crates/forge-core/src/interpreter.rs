//! Workspace interpreter
//!
//! Applies typed commands to the virtual file system, strictly in order, and
//! records every one of them in the [`ExecutionLog`]. `[COMPLETE]` moves the
//! interpreter to [`InterpreterState::Terminated`]; from then on nothing is
//! applied.
//!
//! # Example
//!
//! ```rust
//! use forge_core::{BuildConfig, Outcome, WorkspaceInterpreter};
//! use forge_protocol::Command;
//! use forge_vfs::WorkspacePath;
//!
//! let mut interp = WorkspaceInterpreter::new(&BuildConfig::new());
//! let path = WorkspacePath::parse("/a.txt").unwrap();
//!
//! let entry = interp.apply(Command::Create { path: path.clone(), content: "hi".into() });
//! assert_eq!(entry.outcome, Outcome::Applied);
//!
//! interp.apply(Command::Complete { note: "done".into() });
//! let entry = interp.apply(Command::Delete { path });
//! assert!(matches!(entry.outcome, Outcome::Skipped(_)));
//! ```

use crate::config::BuildConfig;
use crate::log::{ExecutionLog, LogEntry, Outcome, RejectReason, SkipReason};
use forge_protocol::{Command, CommandEnvelope, EditAction, ParseError};
use forge_vfs::{VfsError, VirtualFileSystem};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Interpreter lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterState {
    #[default]
    Running,
    Terminated,
}

/// Applies commands to a [`VirtualFileSystem`] and logs the outcome
#[derive(Debug, Clone)]
pub struct WorkspaceInterpreter {
    vfs: VirtualFileSystem,
    log: ExecutionLog,
    state: InterpreterState,
}

impl WorkspaceInterpreter {
    /// Empty workspace using the config's overwrite policy
    #[must_use]
    pub fn new(config: &BuildConfig) -> Self {
        Self::with_vfs(VirtualFileSystem::with_overwrite(config.allow_overwrite))
    }

    /// Start from an existing tree
    #[must_use]
    pub fn with_vfs(vfs: VirtualFileSystem) -> Self {
        Self {
            vfs,
            log: ExecutionLog::new(),
            state: InterpreterState::Running,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> InterpreterState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == InterpreterState::Terminated
    }

    #[inline]
    #[must_use]
    pub fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    #[inline]
    #[must_use]
    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Apply a command that did not come from a stream
    pub fn apply(&mut self, command: Command) -> &LogEntry {
        self.apply_at(command, None)
    }

    /// Apply a command parsed from `envelope`, recording its stream span
    pub fn apply_envelope(&mut self, envelope: &CommandEnvelope, command: Command) -> &LogEntry {
        self.apply_at(command, Some(envelope.span.clone()))
    }

    /// Record an envelope whose payload failed to parse
    pub fn reject(&mut self, envelope: &CommandEnvelope, error: ParseError) -> &LogEntry {
        let span = Some(envelope.span.clone());
        if self.is_terminated() {
            return self.log.push(
                envelope.kind,
                None,
                span,
                Outcome::Skipped(SkipReason::SessionTerminated),
            );
        }
        tracing::warn!(
            sequence = self.log.next_sequence(),
            kind = %envelope.kind,
            error = %error,
            "command rejected"
        );
        self.log.push(
            envelope.kind,
            None,
            span,
            Outcome::Rejected(RejectReason::Parse(error)),
        )
    }

    /// Hand over the tree and log
    #[must_use]
    pub fn into_parts(self) -> (VirtualFileSystem, ExecutionLog) {
        (self.vfs, self.log)
    }

    fn apply_at(&mut self, command: Command, span: Option<Range<usize>>) -> &LogEntry {
        let kind = command.kind();
        let sequence = self.log.next_sequence();

        if self.is_terminated() {
            tracing::debug!(sequence, %kind, "command after completion skipped");
            return self.log.push(
                kind,
                Some(command),
                span,
                Outcome::Skipped(SkipReason::SessionTerminated),
            );
        }

        let outcome = match self.execute(&command, sequence) {
            Ok(()) => {
                tracing::debug!(sequence, %command, "command applied");
                Outcome::Applied
            }
            Err(error) => {
                tracing::warn!(sequence, %kind, error = %error, "command rejected");
                Outcome::Rejected(RejectReason::Vfs(error))
            }
        };

        if command.is_terminal() {
            self.state = InterpreterState::Terminated;
            tracing::info!(sequence, files = self.vfs.len(), "build complete");
        }
        self.log.push(kind, Some(command), span, outcome)
    }

    fn execute(&mut self, command: &Command, sequence: u64) -> Result<(), VfsError> {
        match command {
            Command::Thought { .. } | Command::Install { .. } | Command::Complete { .. } => Ok(()),
            Command::Create { path, content } => {
                self.vfs.create(path, content.as_str(), sequence).map(|_| ())
            }
            Command::Edit {
                path,
                content,
                action,
            } => match *action {
                EditAction::Replace => self.vfs.write(path, content.as_str(), sequence).map(|_| ()),
                EditAction::Append => self.vfs.append(path, content, sequence).map(|_| ()),
                EditAction::ModifyLines { start, end } => self
                    .vfs
                    .replace_lines(path, start, end, content, sequence)
                    .map(|_| ()),
            },
            Command::Delete { path } => self.vfs.remove(path).map(|_| ()),
        }
    }
}
