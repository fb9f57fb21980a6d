//! Single-value step executed on a spawned task.

use super::lifecycle::Lifecycle;
use super::Step;
use crate::channel::CompletionHandle;
use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use crate::execution::ExecutionState;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Runs the wrapped async function on one spawned tokio task.
///
/// `start` returns as soon as the task is spawned. The task invokes the
/// function with a clone of the context, marks the step `Finished`, enqueues
/// the result, closes its end of the handle and marks the step `Closed`.
/// `close` waits for the task.
///
/// The step is one-shot: a second `start` returns
/// [`StepError::AlreadyStarted`].
pub struct BackgroundStep<I, O, F> {
    name: String,
    func: Arc<F>,
    lifecycle: Lifecycle,
    _phantom: PhantomData<fn(I) -> O>,
}

impl<I, O, F, Fut> BackgroundStep<I, O, F>
where
    F: Fn(StepContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<O>> + Send + 'static,
{
    /// Creates a new background step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
            lifecycle: Lifecycle::default(),
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> BackgroundStep<I, O, F> {
    /// Returns the current execution state.
    ///
    /// Safe to call from any thread while the task is running.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.lifecycle.state()
    }

    /// Returns true once the wrapped function has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state(),
            ExecutionState::Finished | ExecutionState::Closed
        )
    }

    /// Returns the number of background tasks still running.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lifecycle.outstanding()
    }
}

impl<I, O, F> Debug for BackgroundStep<I, O, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundStep")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl<I, O, F, Fut> Step for BackgroundStep<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(StepContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<O>> + Send + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &mut self,
        ctx: &StepContext,
        input: I,
    ) -> Result<CompletionHandle<O>, StepError> {
        let func = self.func.clone();
        let task_ctx = ctx.clone();
        self.lifecycle
            .launch_single(&self.name, ctx, move || func(task_ctx, input))
    }

    async fn close(&mut self, ctx: &StepContext) -> Result<(), StepError> {
        self.lifecycle.join(&self.name, ctx).await
    }
}
