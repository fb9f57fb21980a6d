//! Chat step backed by a [`ChatProvider`].

use super::message::Message;
use crate::channel::CompletionHandle;
use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use crate::execution::ExecutionState;
use crate::settings::StepSettings;
use crate::steps::lifecycle::Lifecycle;
use crate::steps::Step;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

/// A language-model backend.
///
/// Implementations build the request from `settings` and `messages` and parse
/// the reply. Failures are returned as errors; an implementation must never
/// terminate the process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Produces one completion for the conversation.
    async fn complete(
        &self,
        ctx: &StepContext,
        settings: &StepSettings,
        messages: &[Message],
    ) -> Outcome<String>;
}

/// Runs one provider call on a spawned task.
///
/// Settings are validated in `start`; a step with incomplete settings fails
/// there and never contacts the provider. Like [`BackgroundStep`], an instance
/// runs once.
///
/// [`BackgroundStep`]: crate::steps::BackgroundStep
pub struct ChatStep<P> {
    name: String,
    provider: Arc<P>,
    settings: StepSettings,
    lifecycle: Lifecycle,
}

impl<P: ChatProvider> ChatStep<P> {
    /// Creates a chat step.
    pub fn new(name: impl Into<String>, provider: P, settings: StepSettings) -> Self {
        Self::with_shared(name, Arc::new(provider), settings)
    }

    /// Creates a chat step that shares its provider with other steps.
    pub fn with_shared(name: impl Into<String>, provider: Arc<P>, settings: StepSettings) -> Self {
        Self {
            name: name.into(),
            provider,
            settings,
            lifecycle: Lifecycle::default(),
        }
    }
}

impl<P> ChatStep<P> {
    /// Returns the current execution state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.lifecycle.state()
    }

    /// Returns the settings the next `start` will use.
    #[must_use]
    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    /// Requests a streamed response from providers that support one.
    pub fn set_streaming(&mut self, stream: bool) {
        self.settings.chat.stream = stream;
    }
}

impl<P> Debug for ChatStep<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStep")
            .field("name", &self.name)
            .field("engine", &self.settings.chat.engine)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl<P: ChatProvider> Step for ChatStep<P> {
    type Input = Vec<Message>;
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &mut self,
        ctx: &StepContext,
        messages: Vec<Message>,
    ) -> Result<CompletionHandle<String>, StepError> {
        if self.lifecycle.state() != ExecutionState::NotStarted {
            return Err(StepError::AlreadyStarted);
        }

        let kind = self.settings.validate().map_err(|err| {
            warn!(step = %self.name, error = %err, "Chat step settings rejected");
            err
        })?;
        if messages.is_empty() {
            return Err(StepError::InvalidInput(
                "chat step needs at least one message".to_string(),
            ));
        }

        debug!(
            step = %self.name,
            provider = ?kind,
            messages = messages.len(),
            stream = self.settings.chat.stream,
            "Dispatching chat request"
        );

        let provider = self.provider.clone();
        let settings = self.settings.clone();
        let task_ctx = ctx.clone();
        self.lifecycle.launch_single(&self.name, ctx, move || async move {
            provider.complete(&task_ctx, &settings, &messages).await
        })
    }

    async fn close(&mut self, ctx: &StepContext) -> Result<(), StepError> {
        self.lifecycle.join(&self.name, ctx).await
    }
}
