//! Mock wrapped functions and providers for testing.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use crate::providers::{ChatProvider, Message};
use crate::settings::StepSettings;

/// Inputs seen by a function built with [`recording`].
#[derive(Debug)]
pub struct Recorder<I> {
    calls: Arc<Mutex<Vec<I>>>,
}

impl<I> Default for Recorder<I> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<I> Clone for Recorder<I> {
    fn clone(&self) -> Self {
        Self {
            calls: self.calls.clone(),
        }
    }
}

impl<I: Clone> Recorder<I> {
    /// Returns the recorded inputs in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<I> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Clears the recorded inputs.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

/// Wraps `func` so that every input is recorded before it runs.
pub fn recording<I, O, F>(
    func: F,
) -> (impl Fn(I) -> Outcome<O> + Send + Sync + 'static, Recorder<I>)
where
    I: Clone + Send + 'static,
    O: 'static,
    F: Fn(I) -> Outcome<O> + Send + Sync + 'static,
{
    let recorder = Recorder::default();
    let calls = recorder.calls.clone();
    let wrapped = move |input: I| {
        calls.lock().push(input.clone());
        func(input)
    };
    (wrapped, recorder)
}

/// A function that fails every call with `message`.
pub fn failing<I, O>(
    message: impl Into<String>,
) -> impl Fn(I) -> Outcome<O> + Clone + Send + Sync + 'static
where
    I: 'static,
    O: 'static,
{
    let message = message.into();
    move |_input: I| -> Outcome<O> { Err(StepError::failed(message.clone())) }
}

/// Turns `func` into a background function that waits `delay` first.
///
/// The wait ends early if the context is cancelled, in which case the call
/// fails with [`StepError::Cancelled`].
pub fn slow<I, O, F>(
    delay: Duration,
    func: F,
) -> impl Fn(StepContext, I) -> BoxFuture<'static, Outcome<O>> + Send + Sync + 'static
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Outcome<O> + Send + Sync + 'static,
{
    let func = Arc::new(func);
    move |ctx: StepContext, input: I| {
        let func = func.clone();
        async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => func(input),
                () = ctx.cancelled() => ctx.ensure_active().and_then(|()| func(input)),
            }
        }
        .boxed()
    }
}

/// A chat provider that replays scripted replies in order.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Outcome<String>>>,
    conversations: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    /// Creates a provider with no replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a successful reply.
    #[must_use]
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    /// Appends a failing reply.
    #[must_use]
    pub fn with_error(self, error: StepError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    /// Returns the number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.conversations.lock().len()
    }

    /// Returns every conversation received.
    #[must_use]
    pub fn conversations(&self) -> Vec<Vec<Message>> {
        self.conversations.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn complete(
        &self,
        _ctx: &StepContext,
        _settings: &StepSettings,
        messages: &[Message],
    ) -> Outcome<String> {
        self.conversations.lock().push(messages.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(StepError::provider("scripted", "no reply scripted")))
    }
}
