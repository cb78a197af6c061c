//! Streaming build session
//!
//! A [`StreamSession`] owns the whole pipeline for one build request:
//!
//! ```text
//! fragments → TokenBuffer → CommandScanner → CommandParser → WorkspaceInterpreter
//! ```
//!
//! Each fragment is pushed through synchronously before the next is accepted.
//! The session is finalized exactly once: by `[COMPLETE]`, by end of stream,
//! or by an error (transport, oversize payload, cancellation). Files written
//! before an error are kept.
//!
//! # Example
//!
//! ```rust
//! use forge_core::{BuildConfig, SessionState, StreamSession};
//!
//! let mut session = StreamSession::new(&BuildConfig::new());
//! session.feed("[CREATE] file:/a.txt\n```\nhi\n```\n[COMP").unwrap();
//! session.feed("LETE] done\n").unwrap();
//! session.finish().unwrap();
//!
//! let outcome = session.into_outcome();
//! assert_eq!(outcome.state, SessionState::Completed);
//! assert_eq!(outcome.log.len(), 2);
//! ```

use crate::config::BuildConfig;
use crate::error::{SessionError, TransportError};
use crate::interpreter::WorkspaceInterpreter;
use crate::log::{ExecutionLog, LogEntry};
use crate::types::SessionId;
use forge_protocol::{CommandEnvelope, CommandKind, CommandParser, CommandScanner, TokenBuffer};
use forge_vfs::{Snapshot, VirtualFileSystem};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Session lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting fragments
    #[default]
    Streaming,
    /// `[COMPLETE]` was applied
    Completed,
    /// Stream ended without `[COMPLETE]`
    EndOfStream,
    /// Finalized by an error; applied commands are kept
    Failed(SessionError),
}

impl SessionState {
    #[inline]
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        !matches!(self, SessionState::Streaming)
    }

    /// Finalized without error
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::EndOfStream)
    }

    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            SessionState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Progress notification for live display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A command was logged
    Entry { entry: LogEntry },
    /// A command is still accumulating
    Pending { kind: CommandKind, bytes: usize },
    /// The session was finalized
    Finalized { state: SessionState },
}

/// Everything a finalized session hands back
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub session: SessionId,
    pub state: SessionState,
    pub vfs: VirtualFileSystem,
    pub log: ExecutionLog,
    /// Bytes dropped after completion or on failure
    pub discarded_bytes: usize,
}

impl BuildOutcome {
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// Ordered, hashed copy of the final tree
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.vfs.snapshot()
    }

    /// Serializable summary of the build
    #[must_use]
    pub fn report(&self) -> BuildReport {
        BuildReport {
            session: self.session,
            state: self.state.clone(),
            summary: self.log.summary(),
            packages: self.log.packages().into_iter().map(str::to_string).collect(),
            snapshot: self.snapshot(),
            log: self.log.clone(),
            discarded_bytes: self.discarded_bytes,
        }
    }
}

/// Serializable view of a [`BuildOutcome`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub session: SessionId,
    pub state: SessionState,
    pub summary: crate::log::LogSummary,
    pub packages: Vec<String>,
    pub snapshot: Snapshot,
    pub log: ExecutionLog,
    pub discarded_bytes: usize,
}

/// One build request's pipeline
#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    buffer: TokenBuffer,
    scanner: CommandScanner,
    parser: CommandParser,
    interpreter: WorkspaceInterpreter,
    state: SessionState,
    events: Option<UnboundedSender<SessionEvent>>,
    fragment_timeout: Option<Duration>,
    discarded_bytes: usize,
}

impl StreamSession {
    /// New session with an empty workspace
    #[must_use]
    pub fn new(config: &BuildConfig) -> Self {
        let id = SessionId::new();
        tracing::info!(session = %id, allow_overwrite = config.allow_overwrite, "build session started");
        Self {
            id,
            buffer: TokenBuffer::new(),
            scanner: CommandScanner::new().with_max_command_bytes(config.max_command_bytes),
            parser: CommandParser::new(),
            interpreter: WorkspaceInterpreter::new(config),
            state: SessionState::Streaming,
            events: None,
            fragment_timeout: config.fragment_timeout(),
            discarded_bytes: 0,
        }
    }

    /// Forward [`SessionEvent`]s to `tx`
    #[must_use]
    pub fn with_events(mut self, tx: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn vfs(&self) -> &VirtualFileSystem {
        self.interpreter.vfs()
    }

    #[inline]
    #[must_use]
    pub fn log(&self) -> &ExecutionLog {
        self.interpreter.log()
    }

    /// Command still accumulating, if any (never applied)
    #[must_use]
    pub fn provisional(&self) -> Option<CommandEnvelope> {
        self.scanner.provisional()
    }

    /// Bytes held for the line currently being matched
    #[inline]
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.retained_len()
    }

    /// Push one fragment through the pipeline
    ///
    /// Returns the entries logged as a result. After `[COMPLETE]` fragments
    /// are discarded and nothing is logged.
    ///
    /// # Errors
    /// - [`SessionError::Scan`] if a payload outgrows the cap; the session is
    ///   finalized as failed
    /// - [`SessionError::Finalized`] if the session ended another way
    pub fn feed(&mut self, fragment: &str) -> Result<Vec<LogEntry>, SessionError> {
        match self.state {
            SessionState::Streaming => {}
            SessionState::Completed => {
                self.discard_after_completion(fragment.len());
                return Ok(Vec::new());
            }
            SessionState::EndOfStream | SessionState::Failed(_) => {
                return Err(SessionError::Finalized);
            }
        }
        self.buffer.append(fragment);
        let entries = self.pump()?;
        if let Some((kind, bytes)) = self.scanner.pending() {
            self.emit(SessionEvent::Pending { kind, bytes });
        }
        Ok(entries)
    }

    /// Signal end of stream and apply the last command
    ///
    /// Idempotent once the session is finalized without error.
    ///
    /// # Errors
    /// Same as [`feed`](Self::feed).
    pub fn finish(&mut self) -> Result<Vec<LogEntry>, SessionError> {
        match &self.state {
            SessionState::Streaming => {}
            SessionState::Failed(err) => return Err(err.clone()),
            SessionState::Completed | SessionState::EndOfStream => return Ok(Vec::new()),
        }
        self.scanner.end_of_stream();
        let entries = self.pump()?;
        if !self.state.is_finalized() {
            self.finalize(SessionState::EndOfStream);
        }
        Ok(entries)
    }

    /// Finalize in an error state, dropping pending text
    ///
    /// A no-op when the session is already finalized.
    pub fn abort(&mut self, error: SessionError) {
        if self.state.is_finalized() {
            return;
        }
        let dropped = self.buffer.truncate();
        let provisional = self.scanner.discard();
        self.discarded_bytes += dropped + provisional.as_ref().map_or(0, CommandEnvelope::len);
        tracing::warn!(
            session = %self.id,
            error = %error,
            dropped_bytes = dropped,
            provisional = ?provisional.map(|p| p.kind),
            "build session aborted"
        );
        self.finalize(SessionState::Failed(error));
    }

    /// Finalize and hand over tree and log
    ///
    /// A session still streaming is treated as cancelled.
    #[must_use]
    pub fn into_outcome(mut self) -> BuildOutcome {
        if !self.state.is_finalized() {
            self.abort(SessionError::Cancelled);
        }
        let (vfs, log) = self.interpreter.into_parts();
        BuildOutcome {
            session: self.id,
            state: self.state,
            vfs,
            log,
            discarded_bytes: self.discarded_bytes,
        }
    }

    /// Drive the session from a fragment stream until it is finalized
    ///
    /// Stops reading once `[COMPLETE]` is applied. `cancel` resolving, an
    /// idle gap longer than the configured fragment timeout, or a transport
    /// error finalize the session as failed.
    pub async fn drive<S, C>(mut self, fragments: S, cancel: C) -> BuildOutcome
    where
        S: Stream<Item = Result<String, TransportError>>,
        C: Future<Output = ()>,
    {
        futures::pin_mut!(fragments);
        tokio::pin!(cancel);
        let timeout = self.fragment_timeout;

        while !self.state.is_finalized() {
            let next = tokio::select! {
                biased;
                () = &mut cancel => {
                    self.abort(SessionError::Cancelled);
                    break;
                }
                next = next_fragment(&mut fragments, timeout) => next,
            };
            match next {
                Ok(Some(Ok(fragment))) => {
                    if self.feed(&fragment).is_err() {
                        break;
                    }
                }
                Ok(Some(Err(err))) => self.abort(SessionError::Transport(err)),
                Ok(None) => {
                    // Failures are recorded in the session state
                    let _ = self.finish();
                }
                Err(_) => self.abort(SessionError::Timeout {
                    duration_secs: timeout.map_or(0, |d| d.as_secs()),
                }),
            }
        }
        self.into_outcome()
    }

    /// Feed in-memory `fragments` through a fresh session and finish it
    ///
    /// Synchronous counterpart of [`drive`](Self::drive). Feeding stops at the
    /// first fatal error, which ends up in the outcome state.
    #[must_use]
    pub fn replay<'a>(
        config: &BuildConfig,
        fragments: impl IntoIterator<Item = &'a str>,
    ) -> BuildOutcome {
        let mut session = Self::new(config);
        for fragment in fragments {
            if session.feed(fragment).is_err() {
                break;
            }
        }
        let _ = session.finish();
        session.into_outcome()
    }

    fn pump(&mut self) -> Result<Vec<LogEntry>, SessionError> {
        let mut entries = Vec::new();
        loop {
            let envelope = match self.scanner.next_envelope(&mut self.buffer) {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break,
                Err(err) => {
                    let err = SessionError::from(err);
                    self.abort(err.clone());
                    return Err(err);
                }
            };

            tracing::debug!(
                session = %self.id,
                kind = %envelope.kind,
                span = ?envelope.span,
                "envelope complete"
            );
            let entry = match self.parser.parse(&envelope) {
                Ok(command) => self.interpreter.apply_envelope(&envelope, command),
                Err(err) => self.interpreter.reject(&envelope, err),
            }
            .clone();
            self.emit(SessionEvent::Entry {
                entry: entry.clone(),
            });
            entries.push(entry);

            if self.interpreter.is_terminated() {
                let dropped = self.buffer.truncate();
                let provisional = self.scanner.discard();
                self.discard_after_completion(
                    dropped + provisional.as_ref().map_or(0, CommandEnvelope::len),
                );
                self.finalize(SessionState::Completed);
                break;
            }
        }
        self.buffer.reclaim();
        Ok(entries)
    }

    fn discard_after_completion(&mut self, bytes: usize) {
        if bytes > 0 {
            self.discarded_bytes += bytes;
            tracing::warn!(session = %self.id, bytes, "discarding input after completion");
        }
    }

    fn finalize(&mut self, state: SessionState) {
        let summary = self.interpreter.log().summary();
        tracing::info!(
            session = %self.id,
            state = ?state,
            applied = summary.applied,
            rejected = summary.rejected,
            files = self.interpreter.vfs().len(),
            "build session finalized"
        );
        self.state = state;
        self.emit(SessionEvent::Finalized {
            state: self.state.clone(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}

async fn next_fragment<S>(
    fragments: &mut S,
    timeout: Option<Duration>,
) -> Result<Option<Result<String, TransportError>>, tokio::time::error::Elapsed>
where
    S: Stream<Item = Result<String, TransportError>> + Unpin,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fragments.next()).await,
        None => Ok(fragments.next().await),
    }
}
