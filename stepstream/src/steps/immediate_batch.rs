//! Batch step executed on the caller's task.

use super::Step;
use crate::channel::{completion_channel, CompletionHandle};
use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use async_trait::async_trait;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// Applies the wrapped function to every input, in order, inside `start`.
///
/// The handle is sized to the input length and returned fully populated and
/// closed. A failing element does not stop the elements after it.
pub struct ImmediateBatchStep<I, O, F>
where
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn(I) -> O>,
}

impl<I, O, F> ImmediateBatchStep<I, O, F>
where
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    /// Creates a new immediate batch step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> Debug for ImmediateBatchStep<I, O, F>
where
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateBatchStep")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<I, O, F> Step for ImmediateBatchStep<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Outcome<O> + Send + Sync,
{
    type Input = Vec<I>;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &mut self,
        ctx: &StepContext,
        inputs: Vec<I>,
    ) -> Result<CompletionHandle<O>, StepError> {
        let count = inputs.len();
        let (mut producer, handle) = completion_channel(count);

        let mut failures = 0usize;
        for input in inputs {
            let outcome = (self.func)(input);
            if outcome.is_err() {
                failures += 1;
            }
            producer.try_produce(outcome)?;
        }
        producer.close();

        debug!(step = %self.name, run_id = %ctx.run_id(), count, failures, "Immediate batch step produced results");
        Ok(handle)
    }

    async fn close(&mut self, _ctx: &StepContext) -> Result<(), StepError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_hello_drains_to_five() {
        let mut step = ImmediateBatchStep::new("len", |s: String| Ok(s.len()));
        let ctx = StepContext::new();

        let handle = step.start(&ctx, vec!["hello".to_string()]).await.unwrap();
        assert_eq!(handle.capacity(), 1);

        let values: Vec<usize> = handle.collect().await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![5]);
        step.close(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_elements() {
        let mut step = ImmediateBatchStep::new("parse", |s: &'static str| {
            s.parse::<i64>()
                .map_err(|e| StepError::failed(format!("{s}: {e}")))
        });
        let ctx = StepContext::new();

        let results = step
            .start(&ctx, vec!["1", "x", "3"])
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(results[1].as_ref().unwrap_err().to_string().starts_with("x:"));
        assert_eq!(*results[2].as_ref().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_empty_input_yields_closed_empty_handle() {
        let mut step = ImmediateBatchStep::new("noop", |x: u8| Ok(x));
        let ctx = StepContext::new();

        let handle = step.start(&ctx, Vec::new()).await.unwrap();
        assert_eq!(handle.capacity(), 0);
        assert!(handle.collect().await.is_empty());
    }
}
