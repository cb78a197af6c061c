//! Header line of path-bearing commands
//!
//! `file:/src/App.tsx action:modify-lines lines:10-15`

use super::fence::opens_fence;
use crate::command::EditAction;
use crate::error::ParseError;
use crate::marker::CommandKind;
use forge_vfs::WorkspacePath;
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)(?:\s*-\s*(\d+))?$").expect("line range pattern is valid")
});

const PATH_PREFIX: &str = "file:";
const ACTION_ATTR: &str = "action:";
const LINES_ATTR: &str = "lines:";

/// Tokens of a header line
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Header<'a> {
    pub(crate) path: Option<String>,
    pub(crate) action: Option<&'a str>,
    pub(crate) lines: Option<&'a str>,
}

impl<'a> Header<'a> {
    /// Split a trimmed header line into path and attributes
    pub(crate) fn parse(line: &'a str) -> Self {
        let mut header = Header::default();
        if opens_fence(line) {
            return header;
        }

        let mut path_tokens = Vec::new();
        for token in line.split_whitespace() {
            if let Some(value) = token.strip_prefix(ACTION_ATTR) {
                header.action = Some(value);
            } else if let Some(value) = token.strip_prefix(LINES_ATTR) {
                header.lines = Some(value);
            } else {
                path_tokens.push(token);
            }
        }

        let joined = path_tokens.join(" ");
        let raw = joined.strip_prefix(PATH_PREFIX).unwrap_or(&joined);
        let raw = raw.trim().trim_matches(|c| matches!(c, '`' | '"' | '\''));
        if !raw.is_empty() {
            header.path = Some(raw.to_string());
        }
        header
    }

    /// Normalized target path
    pub(crate) fn path(&self, command: CommandKind) -> Result<WorkspacePath, ParseError> {
        let raw = self
            .path
            .as_deref()
            .ok_or(ParseError::MissingPath { command })?;
        let path = WorkspacePath::parse(raw).map_err(|e| ParseError::InvalidPath {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;
        if path.is_root() {
            return Err(ParseError::InvalidPath {
                raw: raw.to_string(),
                reason: "names the workspace root".to_string(),
            });
        }
        Ok(path)
    }

    /// Edit action from `action:` and `lines:`
    ///
    /// A `lines:` attribute without an action implies `modify-lines`.
    pub(crate) fn edit_action(&self) -> Result<EditAction, ParseError> {
        let action = match (self.action, self.lines) {
            (Some(action), _) => action.to_ascii_lowercase(),
            (None, Some(_)) => "modify-lines".to_string(),
            (None, None) => return Ok(EditAction::Replace),
        };
        match action.as_str() {
            "replace" => Ok(EditAction::Replace),
            "append" => Ok(EditAction::Append),
            "modify-lines" | "modify_lines" => {
                let raw = self.lines.unwrap_or_default();
                let (start, end) = parse_line_range(raw)?;
                Ok(EditAction::ModifyLines { start, end })
            }
            _ => Err(ParseError::UnknownEditAction {
                action: self.action.unwrap_or_default().to_string(),
            }),
        }
    }
}

/// `N` or `N-M`, 1-based, `N <= M`
fn parse_line_range(raw: &str) -> Result<(usize, usize), ParseError> {
    let invalid = || ParseError::InvalidLineRange {
        raw: raw.to_string(),
    };
    let caps = LINE_RANGE.captures(raw.trim()).ok_or_else(invalid)?;
    let start: usize = caps[1].parse().map_err(|_| invalid())?;
    let end: usize = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => start,
    };
    if start == 0 || start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_and_attributes() {
        let h = Header::parse("file:/src/App.tsx action:modify-lines lines:10-15");
        assert_eq!(h.path.as_deref(), Some("/src/App.tsx"));
        assert_eq!(h.action, Some("modify-lines"));
        assert_eq!(h.lines, Some("10-15"));
        assert_eq!(
            h.edit_action().unwrap(),
            EditAction::ModifyLines { start: 10, end: 15 }
        );
    }

    #[test]
    fn bare_and_quoted_paths() {
        assert_eq!(Header::parse("/a.rs").path.as_deref(), Some("/a.rs"));
        assert_eq!(Header::parse("`src/a.rs`").path.as_deref(), Some("src/a.rs"));
        assert_eq!(
            Header::parse("file: /my docs/a.md").path.as_deref(),
            Some("/my docs/a.md")
        );
    }

    #[test]
    fn fence_header_has_no_path() {
        let h = Header::parse("```tsx");
        assert_eq!(h, Header::default());
        assert_eq!(
            h.path(CommandKind::Create).unwrap_err(),
            ParseError::MissingPath {
                command: CommandKind::Create
            }
        );
    }

    #[test]
    fn root_and_escaping_paths_are_invalid() {
        for raw in ["file:/", "../etc/passwd"] {
            let err = Header::parse(raw).path(CommandKind::Edit).unwrap_err();
            assert!(matches!(err, ParseError::InvalidPath { .. }), "{raw}: {err}");
        }
    }

    #[test]
    fn action_defaults_and_errors() {
        assert_eq!(Header::parse("/a").edit_action().unwrap(), EditAction::Replace);
        assert_eq!(
            Header::parse("/a action:APPEND").edit_action().unwrap(),
            EditAction::Append
        );
        assert_eq!(
            Header::parse("/a lines:3").edit_action().unwrap(),
            EditAction::ModifyLines { start: 3, end: 3 }
        );
        assert_eq!(
            Header::parse("/a action:patch").edit_action().unwrap_err(),
            ParseError::UnknownEditAction {
                action: "patch".into()
            }
        );
    }

    #[test]
    fn bad_line_ranges() {
        for header in [
            "/a action:modify-lines",
            "/a action:modify-lines lines:0-2",
            "/a action:modify-lines lines:5-2",
            "/a action:modify-lines lines:x-y",
            "/a action:modify-lines lines:99999999999999999999999",
        ] {
            let err = Header::parse(header).edit_action().unwrap_err();
            assert!(matches!(err, ParseError::InvalidLineRange { .. }), "{header}");
        }
    }
}
