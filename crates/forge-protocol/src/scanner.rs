//! Incremental command scanner
//!
//! The scanner walks a [`TokenBuffer`] line by line. A line start is only
//! classified once the bytes present decide it, and a command is only emitted
//! once the next marker or end of stream bounds its payload. Together these make the
//! emitted envelopes independent of how the stream was split into fragments.
//!
//! # Example
//!
//! ```rust
//! use forge_protocol::{CommandKind, CommandScanner, TokenBuffer};
//!
//! let mut buf = TokenBuffer::new();
//! let mut scanner = CommandScanner::new();
//!
//! buf.append("[THOUGHT] plan\n[COMP");
//! // the thought is still open and the next line is undecided
//! assert!(scanner.next_envelope(&mut buf).unwrap().is_none());
//!
//! buf.append("LETE] done");
//! let first = scanner.next_envelope(&mut buf).unwrap().unwrap();
//! assert_eq!(first.kind, CommandKind::Thought);
//! assert_eq!(first.payload, " plan\n");
//!
//! scanner.end_of_stream();
//! let last = scanner.next_envelope(&mut buf).unwrap().unwrap();
//! assert_eq!(last.kind, CommandKind::Complete);
//! assert_eq!(last.payload, " done");
//! ```

use crate::buffer::TokenBuffer;
use crate::command::CommandEnvelope;
use crate::error::ScanError;
use crate::marker::{classify_line, CommandKind, LineStart};
use serde::{Deserialize, Serialize};

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No command open; text is discarded prose
    #[default]
    Outside,
    /// A line start is a partial match for some tag
    InMarker,
    /// Accumulating the payload of the provisional command
    InPayload,
}

/// Command recognized but not yet bounded
#[derive(Debug, Clone)]
struct Provisional {
    kind: CommandKind,
    /// Absolute offset of the marker line
    start: usize,
    /// Indent plus tag length
    marker_len: usize,
    payload: String,
}

impl Provisional {
    fn envelope(&self, complete: bool) -> CommandEnvelope {
        CommandEnvelope {
            kind: self.kind,
            payload: self.payload.clone(),
            span: self.start..self.end(),
            complete,
        }
    }

    fn seal(self) -> CommandEnvelope {
        let span = self.start..self.end();
        CommandEnvelope {
            kind: self.kind,
            payload: self.payload,
            span,
            complete: true,
        }
    }

    #[inline]
    fn end(&self) -> usize {
        self.start + self.marker_len + self.payload.len()
    }
}

/// Three-state scanner with one provisional envelope
#[derive(Debug, Clone)]
pub struct CommandScanner {
    state: ScanState,
    at_line_start: bool,
    provisional: Option<Provisional>,
    finished: bool,
    max_command_bytes: Option<usize>,
}

impl Default for CommandScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandScanner {
    /// Scanner positioned at the start of a stream
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ScanState::Outside,
            at_line_start: true,
            provisional: None,
            finished: false,
            max_command_bytes: None,
        }
    }

    /// Cap the payload size of a single command
    #[must_use]
    pub fn with_max_command_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_command_bytes = limit;
        self
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether end of stream has been signalled
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Signal that no more fragments will arrive
    ///
    /// Pending partial markers resolve as prose and the provisional command is
    /// emitted by the next call to [`next_envelope`](Self::next_envelope).
    pub fn end_of_stream(&mut self) {
        self.finished = true;
    }

    /// Peek at the command still being accumulated, marked incomplete
    #[must_use]
    pub fn provisional(&self) -> Option<CommandEnvelope> {
        self.provisional.as_ref().map(|p| p.envelope(false))
    }

    /// Kind and payload size of the provisional command, without copying it
    #[must_use]
    pub fn pending(&self) -> Option<(CommandKind, usize)> {
        self.provisional.as_ref().map(|p| (p.kind, p.payload.len()))
    }

    /// Drop the provisional command without emitting it
    pub fn discard(&mut self) -> Option<CommandEnvelope> {
        self.state = ScanState::Outside;
        self.provisional.take().map(|p| p.envelope(false))
    }

    /// Scan until the next complete envelope, or until more input is needed
    ///
    /// # Errors
    ///
    /// [`ScanError::PayloadTooLarge`] when the provisional payload outgrows
    /// the configured cap. The provisional command is dropped.
    pub fn next_envelope(
        &mut self,
        buf: &mut TokenBuffer,
    ) -> Result<Option<CommandEnvelope>, ScanError> {
        loop {
            let text = buf.peek_unconsumed();
            if text.is_empty() {
                if self.finished {
                    self.state = ScanState::Outside;
                    return Ok(self.provisional.take().map(Provisional::seal));
                }
                return Ok(None);
            }

            if self.at_line_start {
                match classify_line(text, self.finished) {
                    LineStart::NeedMore => {
                        self.state = ScanState::InMarker;
                        return Ok(None);
                    }
                    LineStart::Marker { kind, tag_end } => {
                        let start = buf.offset();
                        buf.advance(tag_end);
                        self.at_line_start = false;
                        self.state = ScanState::InPayload;
                        tracing::trace!(%kind, offset = start, "marker recognized");
                        let next = Provisional {
                            kind,
                            start,
                            marker_len: tag_end,
                            payload: String::new(),
                        };
                        if let Some(prev) = self.provisional.replace(next) {
                            return Ok(Some(prev.seal()));
                        }
                        continue;
                    }
                    LineStart::Prose => {
                        self.at_line_start = false;
                        self.state = if self.provisional.is_some() {
                            ScanState::InPayload
                        } else {
                            ScanState::Outside
                        };
                    }
                }
            }

            let text = buf.peek_unconsumed();
            let (take, ends_line) = match text.find('\n') {
                Some(idx) => (idx + 1, true),
                None => (text.len(), false),
            };
            if let Some(current) = self.provisional.as_mut() {
                current.payload.push_str(&text[..take]);
                if let Some(limit) = self.max_command_bytes {
                    if current.payload.len() > limit {
                        let command = current.kind;
                        self.provisional = None;
                        self.state = ScanState::Outside;
                        buf.advance(take);
                        return Err(ScanError::PayloadTooLarge { command, limit });
                    }
                }
            }
            buf.advance(take);
            self.at_line_start = ends_line;
        }
    }

    /// Iterate over every envelope the buffer currently yields
    ///
    /// The iterator stops when more input is needed and after the first error.
    pub fn envelopes<'a>(&'a mut self, buf: &'a mut TokenBuffer) -> Envelopes<'a> {
        Envelopes {
            scanner: self,
            buf,
            done: false,
        }
    }
}

/// Lazy sequence of envelopes, see [`CommandScanner::envelopes`]
#[derive(Debug)]
pub struct Envelopes<'a> {
    scanner: &'a mut CommandScanner,
    buf: &'a mut TokenBuffer,
    done: bool,
}

impl Iterator for Envelopes<'_> {
    type Item = Result<CommandEnvelope, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.next_envelope(self.buf) {
            Ok(Some(envelope)) => Some(Ok(envelope)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Envelopes<'_> {}
