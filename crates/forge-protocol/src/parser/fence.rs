//! Line and code-fence helpers for payload text

/// Split off the first non-blank line, trimmed, and the text after it
pub(crate) fn first_line(payload: &str) -> Option<(&str, &str)> {
    let mut rest = payload;
    while !rest.is_empty() {
        let (line, tail) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        if !line.trim().is_empty() {
            return Some((line.trim(), tail));
        }
        rest = tail;
    }
    None
}

/// Whether a line opens a fenced block (three or more backticks)
#[inline]
pub(crate) fn opens_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Whether a line is a bare fence, which can close a block
#[inline]
fn is_bare_fence(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && t.bytes().all(|b| b == b'`')
}

fn skip_blank_lines(text: &str) -> &str {
    let mut rest = text;
    while let Some(idx) = rest.find('\n') {
        if !rest[..idx].trim().is_empty() {
            break;
        }
        rest = &rest[idx + 1..];
    }
    if rest.trim().is_empty() {
        ""
    } else {
        rest
    }
}

/// Extract file content from the text after a header line
///
/// A fenced body keeps the text between the opening fence and the last bare
/// fence line verbatim, final newline included; prose after the closing fence
/// is dropped. An unclosed fence keeps everything after the opening line.
/// Unfenced text is trimmed of leading blank lines and trailing whitespace.
pub(crate) fn extract_content(body: &str) -> String {
    let body = skip_blank_lines(body);
    let (open, after_open) = body.split_once('\n').unwrap_or((body, ""));
    if !opens_fence(open) {
        return body.trim_end().to_string();
    }

    let mut close = None;
    let mut pos = 0;
    for line in after_open.split_inclusive('\n') {
        if is_bare_fence(line) {
            close = Some(pos);
        }
        pos += line.len();
    }

    match close {
        Some(end) => after_open[..end].to_string(),
        None => {
            let inner = after_open.trim_end();
            if inner.is_empty() {
                String::new()
            } else {
                format!("{inner}\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_skips_blanks() {
        assert_eq!(first_line("\n  \n  a b \nrest"), Some(("a b", "rest")));
        assert_eq!(first_line(" only"), Some(("only", "")));
        assert_eq!(first_line(" \n\t\n"), None);
    }

    #[test]
    fn fenced_content_is_verbatim() {
        let body = "```tsx\nconst a = 1;\n\n  indented\n```\n";
        assert_eq!(extract_content(body), "const a = 1;\n\n  indented\n");
    }

    #[test]
    fn prose_after_closing_fence_is_dropped() {
        let body = "\n```\nx\n```\nThis creates the file.\n";
        assert_eq!(extract_content(body), "x\n");
    }

    #[test]
    fn nested_fences_close_at_the_last_one() {
        let body = "```md\n# Title\n```sh\nls\n```\nend\n```\n";
        assert_eq!(extract_content(body), "# Title\n```sh\nls\n```\nend\n");
    }

    #[test]
    fn empty_fence_is_empty_file() {
        assert_eq!(extract_content("```\n```"), "");
        assert_eq!(extract_content("```ts"), "");
    }

    #[test]
    fn unclosed_fence_keeps_remainder() {
        assert_eq!(extract_content("```\nabc\n  \n"), "abc\n");
    }

    #[test]
    fn unfenced_content_is_trimmed() {
        assert_eq!(extract_content("\n\nplain text  \n\n"), "plain text");
        assert_eq!(extract_content("  \n"), "");
    }
}
