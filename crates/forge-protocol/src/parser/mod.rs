//! Envelope → typed command
//!
//! Per-kind payload rules:
//!
//! - `CREATE` / `EDIT`: the first non-blank line is the header
//!   (`file:<path>` plus optional `action:` / `lines:`), the rest is content,
//!   unwrapped from one code fence when present.
//! - `DELETE`: the first non-blank line is the path; the rest is ignored.
//! - `INSTALL`: every non-fence line, split on commas and whitespace.
//! - `THOUGHT` / `COMPLETE`: the trimmed payload.

mod fence;
mod header;

use crate::command::{Command, CommandEnvelope};
use crate::error::ParseError;
use crate::marker::CommandKind;
use fence::{extract_content, first_line, opens_fence};
use header::Header;

const PACKAGE_PREFIX: &str = "package:";

/// Stateless payload parser
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParser;

impl CommandParser {
    /// Create a parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse a complete envelope
    ///
    /// # Errors
    /// Any [`ParseError`]; none of them are fatal to a session.
    pub fn parse(&self, envelope: &CommandEnvelope) -> Result<Command, ParseError> {
        debug_assert!(envelope.complete, "provisional envelope handed to parser");
        parse_payload(envelope.kind, &envelope.payload)
    }
}

/// Parse the raw payload of a command of the given kind
///
/// # Errors
/// See [`ParseError`].
pub fn parse_payload(kind: CommandKind, payload: &str) -> Result<Command, ParseError> {
    match kind {
        CommandKind::Thought => Ok(Command::Thought {
            note: payload.trim().to_string(),
        }),
        CommandKind::Complete => Ok(Command::Complete {
            note: payload.trim().to_string(),
        }),
        CommandKind::Create | CommandKind::Edit => {
            let (line, body) = first_line(payload).ok_or(ParseError::MissingPath { command: kind })?;
            let header = Header::parse(line);
            let path = header.path(kind)?;
            let content = extract_content(body);
            if kind == CommandKind::Create {
                Ok(Command::Create { path, content })
            } else {
                let action = header.edit_action()?;
                Ok(Command::Edit {
                    path,
                    content,
                    action,
                })
            }
        }
        CommandKind::Delete => {
            let (line, _) = first_line(payload).ok_or(ParseError::MissingPath { command: kind })?;
            let path = Header::parse(line).path(kind)?;
            Ok(Command::Delete { path })
        }
        CommandKind::Install => {
            let packages: Vec<String> = payload
                .lines()
                .filter(|line| !opens_fence(line))
                .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
                .map(|token| {
                    token
                        .strip_prefix(PACKAGE_PREFIX)
                        .unwrap_or(token)
                        .trim_matches(|c| matches!(c, '`' | '"' | '\''))
                })
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            if packages.is_empty() {
                return Err(ParseError::EmptyInstallList);
            }
            Ok(Command::Install { packages })
        }
    }
}
