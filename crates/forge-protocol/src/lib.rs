//! Forge command protocol
//!
//! Turns a fragmented model text stream into typed build commands.
//!
//! # Core Concepts
//!
//! - [`TokenBuffer`]: Arriving text not yet scanned
//! - [`CommandScanner`]: Line-leading marker detection with one provisional command
//! - [`CommandEnvelope`]: Marker kind + raw payload + stream span
//! - [`CommandParser`]: Envelope → [`Command`], or a recoverable [`ParseError`]
//!
//! # Grammar
//!
//! ````text
//! [THOUGHT] Creating the entry component.
//! [CREATE] file:/App.tsx
//! ```tsx
//! export default function App() {}
//! ```
//! [EDIT] file:/App.tsx action:append
//! [INSTALL] package:axios@^1.6.0
//! [COMPLETE] Built the app.
//! ````
//!
//! # Example
//!
//! ```rust
//! use forge_protocol::{Command, CommandParser, CommandScanner, TokenBuffer};
//!
//! let mut buf = TokenBuffer::new();
//! let mut scanner = CommandScanner::new();
//! buf.append("[INSTALL] left-pad, react\n[COMPLETE] done\n");
//! scanner.end_of_stream();
//!
//! let parser = CommandParser::new();
//! let commands: Vec<Command> = scanner
//!     .envelopes(&mut buf)
//!     .map(|env| parser.parse(&env.unwrap()).unwrap())
//!     .collect();
//!
//! assert_eq!(commands.len(), 2);
//! assert!(commands[1].is_terminal());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod buffer;
mod command;
mod error;
mod marker;
mod parser;
mod scanner;

pub use buffer::{split_fragments, TokenBuffer};
pub use command::{Command, CommandEnvelope, EditAction};
pub use error::{ParseError, ScanError};
pub use marker::CommandKind;
pub use parser::{parse_payload, CommandParser};
pub use scanner::{CommandScanner, Envelopes, ScanState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const TRANSCRIPT: &str = "Here is your app.\n\
[THOUGHT] Creating the entry component.\n\
[CREATE] file:/App.tsx\n\
```tsx\n\
export default function App() {}\n\
```\n\
[EDIT] file:/App.tsx action:append\n\
```tsx\n\
// footer\n\
```\n\
[UNKNOWN] foo\n\
[INSTALL] package:axios@^1.6.0\n\
[COMPLETE] Built the app.\n";

    fn parse_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Vec<Result<Command, ParseError>> {
        let parser = CommandParser::new();
        let mut buf = TokenBuffer::new();
        let mut scanner = CommandScanner::new();
        let mut out = Vec::new();
        for fragment in fragments {
            buf.append(fragment);
            for envelope in scanner.envelopes(&mut buf) {
                out.push(parser.parse(&envelope.unwrap()));
            }
            buf.reclaim();
        }
        scanner.end_of_stream();
        for envelope in scanner.envelopes(&mut buf) {
            out.push(parser.parse(&envelope.unwrap()));
        }
        out
    }

    fn split_at_cuts(text: &str, mut cuts: Vec<usize>) -> Vec<&str> {
        cuts.retain(|c| text.is_char_boundary(*c));
        cuts.sort_unstable();
        cuts.dedup();
        let mut pieces = Vec::new();
        let mut last = 0;
        for cut in cuts {
            pieces.push(&text[last..cut]);
            last = cut;
        }
        pieces.push(&text[last..]);
        pieces
    }

    #[test]
    fn full_transcript() {
        let commands: Vec<Command> = parse_fragments([TRANSCRIPT])
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        let kinds: Vec<CommandKind> = commands.iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Thought,
                CommandKind::Create,
                CommandKind::Edit,
                CommandKind::Install,
                CommandKind::Complete,
            ]
        );
        match &commands[2] {
            Command::Edit {
                content, action, ..
            } => {
                assert_eq!(*action, EditAction::Append);
                // the unknown marker line is prose after the closing fence
                assert_eq!(content, "// footer\n");
            }
            other => panic!("expected edit, got {other:?}"),
        }
    }

    #[test]
    fn one_byte_fragments() {
        let whole = parse_fragments([TRANSCRIPT]);
        let bytes: Vec<&str> = (0..TRANSCRIPT.len())
            .map(|i| &TRANSCRIPT[i..=i])
            .collect();
        assert_eq!(parse_fragments(bytes), whole);
    }

    proptest! {
        #[test]
        fn any_partition_parses_the_same(cuts in prop::collection::vec(0usize..TRANSCRIPT.len(), 0..40)) {
            let whole = parse_fragments([TRANSCRIPT]);
            let pieces = split_at_cuts(TRANSCRIPT, cuts);
            prop_assert_eq!(parse_fragments(pieces), whole);
        }
    }
}
