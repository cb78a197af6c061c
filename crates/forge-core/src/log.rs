//! Append-only execution log
//!
//! One entry per complete envelope, in stream order. The sequence number of an
//! entry is its index, so the log is gap-free by construction, and every file
//! in the tree records the sequence of the entry that last wrote it.

use forge_protocol::{Command, CommandKind, ParseError};
use forge_vfs::VfsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Why a command was not applied although it was well formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Arrived after `[COMPLETE]`
    SessionTerminated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SessionTerminated => f.write_str("session terminated"),
        }
    }
}

/// Why a command was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Payload could not be typed
    #[error(transparent)]
    Parse(ParseError),

    /// File system conflict
    #[error(transparent)]
    Vfs(VfsError),
}

/// Result of one log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
    Rejected(RejectReason),
}

impl Outcome {
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => f.write_str("applied"),
            Outcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            Outcome::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// One processed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Index in the log
    pub sequence: u64,
    /// Marker kind, known even when parsing failed
    pub kind: CommandKind,
    /// Typed command; absent when the payload failed to parse
    pub command: Option<Command>,
    /// Byte range of the command in the stream, when it came from one
    pub span: Option<Range<usize>>,
    pub outcome: Outcome,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:<4} ", self.sequence)?;
        match &self.command {
            Some(command) => write!(f, "{command}")?,
            None => write!(f, "{}", self.kind)?,
        }
        write!(f, " -> {}", self.outcome)
    }
}

/// Counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub applied: usize,
    pub skipped: usize,
    pub rejected: usize,
}

/// Ordered, append-only log of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next entry will get
    #[inline]
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    pub(crate) fn push(
        &mut self,
        kind: CommandKind,
        command: Option<Command>,
        span: Option<Range<usize>>,
        outcome: Outcome,
    ) -> &LogEntry {
        let sequence = self.next_sequence();
        self.entries.push(LogEntry {
            sequence,
            kind,
            command,
            span,
            outcome,
        });
        &self.entries[self.entries.len() - 1]
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn get(&self, sequence: u64) -> Option<&LogEntry> {
        usize::try_from(sequence)
            .ok()
            .and_then(|idx| self.entries.get(idx))
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commands that were applied, in order
    pub fn applied(&self) -> impl Iterator<Item = &Command> {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_applied())
            .filter_map(|e| e.command.as_ref())
    }

    /// Rejected entries
    pub fn rejected(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.outcome.is_rejected())
    }

    /// Packages recorded by applied `[INSTALL]` commands, first mention wins
    #[must_use]
    pub fn packages(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for command in self.applied() {
            if let Command::Install { packages } = command {
                for package in packages {
                    if !out.contains(&package.as_str()) {
                        out.push(package.as_str());
                    }
                }
            }
        }
        out
    }

    #[must_use]
    pub fn summary(&self) -> LogSummary {
        self.entries
            .iter()
            .fold(LogSummary::default(), |mut acc, e| {
                match e.outcome {
                    Outcome::Applied => acc.applied += 1,
                    Outcome::Skipped(_) => acc.skipped += 1,
                    Outcome::Rejected(_) => acc.rejected += 1,
                }
                acc
            })
    }
}

impl<'a> IntoIterator for &'a ExecutionLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_vfs::WorkspacePath;

    fn install(names: &[&str]) -> Command {
        Command::Install {
            packages: names.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn sequences_are_indices() {
        let mut log = ExecutionLog::new();
        log.push(CommandKind::Thought, None, None, Outcome::Applied);
        let entry = log.push(
            CommandKind::Delete,
            None,
            Some(3..9),
            Outcome::Rejected(RejectReason::Parse(ParseError::MissingPath {
                command: CommandKind::Delete,
            })),
        );
        assert_eq!(entry.sequence, 1);
        assert_eq!(log.next_sequence(), 2);
        assert_eq!(log.get(1).unwrap().span, Some(3..9));
        assert!(log.get(2).is_none());
    }

    #[test]
    fn packages_dedup_in_order() {
        let mut log = ExecutionLog::new();
        log.push(CommandKind::Install, Some(install(&["react", "axios"])), None, Outcome::Applied);
        log.push(
            CommandKind::Install,
            Some(install(&["ignored"])),
            None,
            Outcome::Skipped(SkipReason::SessionTerminated),
        );
        log.push(CommandKind::Install, Some(install(&["axios", "zod"])), None, Outcome::Applied);
        assert_eq!(log.packages(), vec!["react", "axios", "zod"]);
    }

    #[test]
    fn summary_counts() {
        let mut log = ExecutionLog::new();
        let path = WorkspacePath::parse("/a").unwrap();
        log.push(CommandKind::Thought, None, None, Outcome::Applied);
        log.push(
            CommandKind::Edit,
            None,
            None,
            Outcome::Rejected(RejectReason::Vfs(VfsError::NotFound(path))),
        );
        log.push(
            CommandKind::Thought,
            None,
            None,
            Outcome::Skipped(SkipReason::SessionTerminated),
        );
        assert_eq!(
            log.summary(),
            LogSummary {
                applied: 1,
                skipped: 1,
                rejected: 1
            }
        );
        assert_eq!(log.rejected().count(), 1);
    }

    #[test]
    fn entry_display() {
        let mut log = ExecutionLog::new();
        let entry = log.push(
            CommandKind::Edit,
            None,
            None,
            Outcome::Rejected(RejectReason::Vfs(VfsError::NotFound(
                WorkspacePath::parse("/a").unwrap(),
            ))),
        );
        assert_eq!(entry.to_string(), "#0    EDIT -> rejected: path not found: /a");
    }

    #[test]
    fn outcome_json_shape() {
        let json = serde_json::to_value(Outcome::Skipped(SkipReason::SessionTerminated)).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "session_terminated");
        let json = serde_json::to_value(Outcome::Applied).unwrap();
        assert_eq!(json["status"], "applied");
    }
}
