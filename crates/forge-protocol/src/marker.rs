//! Command markers
//!
//! The six literal, line-leading tags that open a command in the model's text
//! stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a build command, one per marker tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// `[THOUGHT]` - narration, never mutates the tree
    Thought,
    /// `[CREATE]` - new file
    Create,
    /// `[EDIT]` - change an existing file
    Edit,
    /// `[DELETE]` - remove a file
    Delete,
    /// `[INSTALL]` - record package dependencies
    Install,
    /// `[COMPLETE]` - terminal command
    Complete,
}

impl CommandKind {
    /// Every kind, in tag-matching order
    pub const ALL: [CommandKind; 6] = [
        CommandKind::Thought,
        CommandKind::Create,
        CommandKind::Edit,
        CommandKind::Delete,
        CommandKind::Install,
        CommandKind::Complete,
    ];

    /// Literal bracketed tag
    #[inline]
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            CommandKind::Thought => "[THOUGHT]",
            CommandKind::Create => "[CREATE]",
            CommandKind::Edit => "[EDIT]",
            CommandKind::Delete => "[DELETE]",
            CommandKind::Install => "[INSTALL]",
            CommandKind::Complete => "[COMPLETE]",
        }
    }

    /// Whether applying this kind ends the session
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, CommandKind::Complete)
    }

    /// Whether this kind can change the virtual file system
    #[inline]
    #[must_use]
    pub const fn mutates_tree(self) -> bool {
        matches!(
            self,
            CommandKind::Create | CommandKind::Edit | CommandKind::Delete
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        f.write_str(&tag[1..tag.len() - 1])
    }
}

/// Classification of text at a line start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineStart {
    /// A full tag; `tag_end` is the byte offset just past `]`
    Marker { kind: CommandKind, tag_end: usize },
    /// Ordinary text (including unknown bracketed words)
    Prose,
    /// Could still become a marker once more bytes arrive
    NeedMore,
}

/// Classify `text`, which must begin at a line start
///
/// Leading spaces and tabs are allowed before the tag. The answer only
/// depends on bytes that are present, so it is the same for any split of the
/// stream: `NeedMore` is returned exactly when the available bytes are a
/// strict prefix of `<ws>*<tag>`.
pub(crate) fn classify_line(text: &str, at_eof: bool) -> LineStart {
    let indent = text
        .bytes()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    let rest = &text.as_bytes()[indent..];

    for kind in CommandKind::ALL {
        if rest.starts_with(kind.tag().as_bytes()) {
            return LineStart::Marker {
                kind,
                tag_end: indent + kind.tag().len(),
            };
        }
    }

    let could_grow = CommandKind::ALL
        .iter()
        .any(|kind| kind.tag().as_bytes().starts_with(rest));
    if could_grow && !at_eof {
        LineStart::NeedMore
    } else {
        LineStart::Prose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_tag() {
        for kind in CommandKind::ALL {
            let line = format!("{} payload", kind.tag());
            assert_eq!(
                classify_line(&line, false),
                LineStart::Marker {
                    kind,
                    tag_end: kind.tag().len()
                }
            );
        }
    }

    #[test]
    fn allows_leading_whitespace() {
        assert_eq!(
            classify_line(" \t[CREATE] file:/a", false),
            LineStart::Marker {
                kind: CommandKind::Create,
                tag_end: 10
            }
        );
    }

    #[test]
    fn partial_tag_needs_more() {
        assert_eq!(classify_line("[CRE", false), LineStart::NeedMore);
        assert_eq!(classify_line("   ", false), LineStart::NeedMore);
        assert_eq!(classify_line("", false), LineStart::NeedMore);
        assert_eq!(classify_line("[", false), LineStart::NeedMore);
    }

    #[test]
    fn partial_tag_at_eof_is_prose() {
        assert_eq!(classify_line("[CRE", true), LineStart::Prose);
    }

    #[test]
    fn unknown_and_lowercase_tags_are_prose() {
        assert_eq!(classify_line("[UNKNOWN] foo", false), LineStart::Prose);
        assert_eq!(classify_line("[create] foo", false), LineStart::Prose);
        assert_eq!(classify_line("[CREATED]", false), LineStart::Prose);
        assert_eq!(classify_line("x [CREATE]", false), LineStart::Prose);
        assert_eq!(classify_line("[CRE\n", false), LineStart::Prose);
    }

    #[test]
    fn display_strips_brackets() {
        assert_eq!(CommandKind::Complete.to_string(), "COMPLETE");
    }

    #[test]
    fn kind_properties() {
        assert!(CommandKind::Complete.is_terminal());
        assert!(!CommandKind::Thought.is_terminal());
        assert!(CommandKind::Edit.mutates_tree());
        assert!(!CommandKind::Install.mutates_tree());
    }
}
