//! Model client boundary
//!
//! A [`ModelClient`] turns one chat request into a stream of text fragments.
//! The HTTP transport lives outside this crate; callers pass a client into
//! [`WorkspaceBuilder::new`](crate::WorkspaceBuilder::new).

use crate::error::TransportError;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Fragments of model output, in arrival order
pub type FragmentStream = BoxStream<'static, Result<String, TransportError>>;

/// Fully resolved request sent to a model provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Streaming chat completion provider
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Open a fragment stream for `request`
    ///
    /// Errors returned here mean the stream never started; errors inside the
    /// stream end a build that is already under way.
    async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream, TransportError>;
}
