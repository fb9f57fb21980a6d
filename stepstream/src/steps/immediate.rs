//! Single-value step executed on the caller's task.

use super::Step;
use crate::channel::{completion_channel, CompletionHandle};
use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use async_trait::async_trait;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// Runs the wrapped function inline inside `start`.
///
/// The returned handle already holds the single result and is closed. The step
/// keeps no per-run state, so it may be started any number of times and
/// `close` has nothing to wait for.
pub struct ImmediateStep<I, O, F>
where
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn(I) -> O>,
}

impl<I, O, F> ImmediateStep<I, O, F>
where
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    /// Creates a new immediate step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> Debug for ImmediateStep<I, O, F>
where
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateStep")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<I, O, F> Step for ImmediateStep<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Outcome<O> + Send + Sync,
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
        let (mut producer, handle) = completion_channel(1);
        producer.try_produce((self.func)(input))?;
        producer.close();

        debug!(step = %self.name, run_id = %ctx.run_id(), "Immediate step produced result");
        Ok(handle)
    }

    async fn close(&mut self, _ctx: &StepContext) -> Result<(), StepError> {
        Ok(())
    }
}
