//! One build request, end to end
//!
//! [`WorkspaceBuilder`] validates a [`BuildRequest`], asks its
//! [`ModelClient`] for a fragment stream and drives a fresh
//! [`StreamSession`] over it.
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_core::{BuildConfig, BuildRequest, WorkspaceBuilder};
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn forge_core::ModelClient>) -> Result<(), forge_core::BuildError> {
//! let builder = WorkspaceBuilder::new(client, BuildConfig::new());
//! let outcome = builder.build(BuildRequest::new("a counter app")).await?;
//!
//! for file in outcome.vfs.list_tree() {
//!     println!("{}", file.path());
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::{ModelClient, ModelRequest};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::prompt::{user_message, SYSTEM_PROMPT};
use crate::session::{BuildOutcome, SessionEvent, StreamSession};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub request: String,
    /// Overrides the configured model
    #[serde(default)]
    pub model: Option<String>,
}

impl BuildRequest {
    #[inline]
    #[must_use]
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            model: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// # Errors
    /// [`BuildError::EmptyRequest`] if the request is blank
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.request.trim().is_empty() {
            return Err(BuildError::EmptyRequest);
        }
        Ok(())
    }
}

/// Runs build requests against a model client
#[derive(Clone)]
pub struct WorkspaceBuilder {
    client: Arc<dyn ModelClient>,
    config: BuildConfig,
}

impl std::fmt::Debug for WorkspaceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkspaceBuilder {
    #[must_use]
    pub fn new(client: Arc<dyn ModelClient>, config: BuildConfig) -> Self {
        Self { client, config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Resolve the provider request for `request`
    ///
    /// # Errors
    /// [`BuildError::EmptyRequest`] if the request is blank
    pub fn model_request(&self, request: &BuildRequest) -> Result<ModelRequest, BuildError> {
        request.validate()?;
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.model.as_str());
        Ok(ModelRequest {
            model: model.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_message: user_message(&request.request),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        })
    }

    /// Run a build to completion
    ///
    /// # Errors
    /// See [`build_with`](Self::build_with).
    pub async fn build(&self, request: BuildRequest) -> Result<BuildOutcome, BuildError> {
        self.build_with(request, None, futures::future::pending()).await
    }

    /// Run a build with live events and a cancellation signal
    ///
    /// Only failures before the first fragment are errors here. Failures
    /// after that finalize the session and show up in
    /// [`BuildOutcome::state`].
    ///
    /// # Errors
    /// - [`BuildError::EmptyRequest`] if the request is blank
    /// - [`BuildError::Client`] if the stream could not be opened
    pub async fn build_with<C>(
        &self,
        request: BuildRequest,
        events: Option<UnboundedSender<SessionEvent>>,
        cancel: C,
    ) -> Result<BuildOutcome, BuildError>
    where
        C: Future<Output = ()>,
    {
        let model_request = self.model_request(&request)?;
        tracing::info!(model = %model_request.model, "starting build");

        let fragments = self.client.stream(&model_request).await?;
        let mut session = StreamSession::new(&self.config);
        if let Some(tx) = events {
            session = session.with_events(tx);
        }
        Ok(session.drive(fragments, cancel).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FragmentStream;
    use crate::error::TransportError;
    use crate::session::SessionState;
    use futures::StreamExt;
    use std::sync::Mutex;

    /// Replays canned fragments and remembers the last request
    struct Canned {
        fragments: Vec<&'static str>,
        seen: Mutex<Option<ModelRequest>>,
    }

    #[async_trait::async_trait]
    impl ModelClient for Canned {
        async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream, TransportError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            let items: Vec<Result<String, TransportError>> =
                self.fragments.iter().map(|f| Ok((*f).to_string())).collect();
            Ok(futures::stream::iter(items).boxed())
        }
    }

    fn canned(fragments: Vec<&'static str>) -> Arc<Canned> {
        Arc::new(Canned {
            fragments,
            seen: Mutex::new(None),
        })
    }

    #[test]
    fn blank_request_is_rejected() {
        let builder = WorkspaceBuilder::new(canned(vec![]), BuildConfig::new());
        assert!(matches!(
            builder.model_request(&BuildRequest::new("  \n")),
            Err(BuildError::EmptyRequest)
        ));
    }

    #[test]
    fn model_request_uses_config_and_override() {
        let config = BuildConfig::new().with_model("base").with_max_tokens(100);
        let builder = WorkspaceBuilder::new(canned(vec![]), config);

        let req = builder.model_request(&BuildRequest::new("todo app")).unwrap();
        assert_eq!(req.model, "base");
        assert_eq!(req.max_tokens, 100);
        assert!(req.user_message.contains("todo app"));
        assert_eq!(req.system_prompt, SYSTEM_PROMPT);

        let req = builder
            .model_request(&BuildRequest::new("todo app").with_model("other"))
            .unwrap();
        assert_eq!(req.model, "other");
    }

    #[tokio::test]
    async fn build_streams_into_session() {
        let client = canned(vec!["[CREATE] file:/a.txt\n```\nhi\n", "```\n[COMPLETE] done\n"]);
        let builder = WorkspaceBuilder::new(client.clone(), BuildConfig::new());
        let outcome = builder.build(BuildRequest::new("hello")).await.unwrap();

        assert_eq!(outcome.state, SessionState::Completed);
        assert_eq!(outcome.vfs.len(), 1);
        let seen = client.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.model, crate::config::DEFAULT_MODEL);
    }
}
