//! Testing utilities for the Forge workspace
//!
//! Shared transcripts, stream-splitting helpers and scripted model clients.

#![allow(missing_docs)]

use forge_core::{
    BuildConfig, BuildOutcome, FragmentStream, ModelClient, ModelRequest, StreamSession,
    TransportError,
};
use forge_protocol::split_fragments;
use forge_vfs::WorkspacePath;
use futures::StreamExt;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

/// Realistic model output: prose, every command kind, an unknown tag
pub const COUNTER_APP: &str = r#"Sure! I'll build a small counter app.

[THOUGHT] I'll start with the entry component, then styles, then wire up state.
[CREATE] file:/App.tsx
```tsx
import React, { useState } from 'react';
import './App.css';

export default function App() {
  const [count, setCount] = useState(0);
  return <button onClick={() => setCount(count + 1)}>{count}</button>;
}
```
[CREATE] file:/App.css
```css
button {
  padding: 1rem;
}
```
[NOTE] this tag is not part of the grammar and stays in the payload
[EDIT] file:/App.css action:append
```css
button:hover {
  opacity: 0.8;
}
```
[EDIT] file:/App.tsx action:modify-lines lines:4-4
```tsx
export default function Counter() {
```
[CREATE] file:/scratch.txt
temporary
[DELETE] file:/scratch.txt
[INSTALL] package:react@^18.2.0, package:react-dom@^18.2.0
[COMPLETE] Built a counter app with a styled button.
Anything after completion is ignored.
[CREATE] file:/never.txt
nope
"#;

/// Conflicts and parse failures that a session must survive
pub const MESSY: &str = "[EDIT] file:/missing.ts\n\
```ts\nx\n```\n\
[CREATE]\n\
[CREATE] file:/a.ts\n\
one\n\
[CREATE] file:/a.ts\n\
two\n\
[CREATE] file:/a.ts/child.ts\n\
x\n\
[INSTALL] ,\n\
[EDIT] file:/a.ts action:rewrite\n\
y\n\
[DELETE] file:/../../etc/passwd\n\
[THOUGHT] still going\n";

/// Path helper that panics on invalid input
#[must_use]
pub fn path(raw: &str) -> WorkspacePath {
    WorkspacePath::parse(raw).unwrap()
}

/// Split into pieces of at most `size` bytes, never inside a character
#[must_use]
pub fn chunks(text: &str, size: usize) -> Vec<&str> {
    assert!(size > 0, "chunk size must be positive");
    split_fragments(text, size)
}

/// One piece per character
#[must_use]
pub fn char_chunks(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(idx, ch)| &text[idx..idx + ch.len_utf8()])
        .collect()
}

/// Split at the given byte offsets; offsets off a char boundary are ignored
#[must_use]
pub fn split_at_cuts(text: &str, mut cuts: Vec<usize>) -> Vec<&str> {
    cuts.retain(|c| *c < text.len() && text.is_char_boundary(*c));
    cuts.sort_unstable();
    cuts.dedup();
    let mut out = Vec::with_capacity(cuts.len() + 1);
    let mut last = 0;
    for cut in cuts {
        out.push(&text[last..cut]);
        last = cut;
    }
    out.push(&text[last..]);
    out
}

/// Random cut offsets into a text of `len` bytes
pub fn arb_cuts(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..len.max(1), 0..64)
}

/// Feed `fragments` through a fresh session and finish it
#[must_use]
pub fn run_fragments<'a>(
    config: &BuildConfig,
    fragments: impl IntoIterator<Item = &'a str>,
) -> BuildOutcome {
    StreamSession::replay(config, fragments)
}

/// Model client that replays a fixed script
///
/// The script may end with a transport error. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Vec<Result<String, TransportError>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedClient {
    /// Replay `text` split into `chunk_size`-byte fragments
    #[must_use]
    pub fn new(text: &str, chunk_size: usize) -> Self {
        Self {
            script: chunks(text, chunk_size)
                .into_iter()
                .map(|c| Ok(c.to_string()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Break the stream with `error` after the scripted fragments
    #[must_use]
    pub fn then_fail(mut self, error: TransportError) -> Self {
        self.script.push(Err(error));
        self
    }

    #[must_use]
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedClient {
    async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(futures::stream::iter(self.script.clone()).boxed())
    }
}

/// Model client whose stream never opens
#[derive(Debug, Clone)]
pub struct RefusingClient(pub TransportError);

#[async_trait::async_trait]
impl ModelClient for RefusingClient {
    async fn stream(&self, _request: &ModelRequest) -> Result<FragmentStream, TransportError> {
        Err(self.0.clone())
    }
}
