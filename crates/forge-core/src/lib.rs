//! Forge Core - streaming workspace builds
//!
//! Consumes a model's fragmented text stream and turns it into validated
//! mutations of an in-memory project tree:
//! - Scans and parses commands as soon as their extent is known
//! - Applies them in arrival order, logging every outcome
//! - Stops at `[COMPLETE]`, end of stream, or the first fatal error
//! - Produces the same tree for any split of the stream into fragments
//!
//! # Example
//!
//! ```rust
//! use forge_core::{BuildConfig, StreamSession};
//! use forge_vfs::WorkspacePath;
//!
//! let mut session = StreamSession::new(&BuildConfig::new());
//! for fragment in ["[CREATE] file:/App.tsx\n```tsx\nexport default ", "function App() {}\n```\n"] {
//!     session.feed(fragment).unwrap();
//! }
//! session.finish().unwrap();
//!
//! let app = WorkspacePath::parse("/App.tsx").unwrap();
//! assert_eq!(
//!     session.vfs().read(&app).unwrap().content(),
//!     "export default function App() {}\n"
//! );
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod log;
pub mod prompt;
pub mod session;
pub mod types;

// Re-exports for convenience
pub use builder::{BuildRequest, WorkspaceBuilder};
pub use client::{FragmentStream, ModelClient, ModelRequest};
pub use config::{BuildConfig, DEFAULT_MODEL};
pub use error::{BuildError, ConfigError, SessionError, TransportError};
pub use interpreter::{InterpreterState, WorkspaceInterpreter};
pub use log::{ExecutionLog, LogEntry, LogSummary, Outcome, RejectReason, SkipReason};
pub use prompt::{user_message, SYSTEM_PROMPT};
pub use session::{BuildOutcome, BuildReport, SessionEvent, SessionState, StreamSession};
pub use types::SessionId;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Forge Core
    pub use crate::{
        BuildConfig, BuildOutcome, BuildRequest, ExecutionLog, ModelClient, Outcome,
        SessionState, StreamSession, WorkspaceBuilder,
    };
    pub use forge_protocol::{Command, CommandKind, EditAction};
    pub use forge_vfs::{VirtualFileSystem, WorkspacePath};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
