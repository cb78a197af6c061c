//! Builder prompt
//!
//! The system prompt teaches the model the command grammar the scanner and
//! parser accept; the user message wraps the build request.

/// System prompt describing the command grammar
pub const SYSTEM_PROMPT: &str = r#"You are a workspace builder. You build complete applications by emitting commands that are applied, in order, to an in-memory project tree.

Every command starts at the beginning of a line with one of these tags:

[THOUGHT] <text>
    Explain what you are about to do. Never changes files.

[CREATE] file:/path/to/file.ext
```lang
<complete file content>
```
    Create a new file. Creating a path that already exists is rejected.

[EDIT] file:/path/to/file.ext action:replace
```lang
<new complete file content>
```
    Change an existing file. Actions:
    - action:replace (default) replaces the whole file
    - action:append adds the content to the end of the file
    - action:modify-lines lines:10-15 replaces lines 10 to 15 (1-based, inclusive)
    Editing a file that was never created is rejected.

[DELETE] file:/path/to/file.ext
    Remove a file.

[INSTALL] package:name@version
    Record a dependency. Several packages may be separated by commas or spaces.

[COMPLETE] <summary>
    Finish the build. Nothing after this command is applied.

Rules:
- Paths are absolute, POSIX style, and case sensitive. `..` may not leave the project root.
- Put the path on the same line as the tag and the content in one fenced code block.
- Write complete, working code. No placeholders such as "rest of code here".
- Create a file before editing it.
- Do not put a tag at the start of a line inside file content.
- End with exactly one [COMPLETE]."#;

/// Wrap a build request in the user message sent to the model
#[must_use]
pub fn user_message(request: &str) -> String {
    format!(
        "Build this application:\n\n{}\n\nRemember to use the command format \
         ([THOUGHT], [CREATE], [EDIT], [DELETE], [INSTALL], [COMPLETE]) and provide complete, working code.",
        request.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_protocol::CommandKind;

    #[test]
    fn prompt_teaches_every_tag() {
        for kind in CommandKind::ALL {
            assert!(SYSTEM_PROMPT.contains(kind.tag()), "{kind} missing");
        }
    }

    #[test]
    fn user_message_wraps_request() {
        let msg = user_message("  a todo app \n");
        assert!(msg.starts_with("Build this application:\n\na todo app\n\n"));
        assert!(msg.contains("[COMPLETE]"));
    }
}
