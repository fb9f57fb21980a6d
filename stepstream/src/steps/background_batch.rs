//! Batch step executed on one spawned task.

use super::lifecycle::{self, Lifecycle};
use super::Step;
use crate::channel::{completion_channel, CompletionHandle};
use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use crate::execution::ExecutionState;
use crate::observability::SpanTimer;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Applies the wrapped async function to every input on one spawned task.
///
/// Results are enqueued as they are produced, in input order, so the caller can
/// observe partial progress. Inputs are processed one after another; there is no
/// fan-out within an instance. The task closes the handle after the last input
/// and `close` only waits for it.
pub struct BackgroundBatchStep<I, O, F> {
    name: String,
    func: Arc<F>,
    lifecycle: Lifecycle,
    _phantom: PhantomData<fn(I) -> O>,
}

impl<I, O, F, Fut> BackgroundBatchStep<I, O, F>
where
    F: Fn(StepContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<O>> + Send + 'static,
{
    /// Creates a new background batch step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
            lifecycle: Lifecycle::default(),
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> BackgroundBatchStep<I, O, F> {
    /// Returns the current execution state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.lifecycle.state()
    }

    /// Returns the number of background tasks still running.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lifecycle.outstanding()
    }
}

impl<I, O, F> Debug for BackgroundBatchStep<I, O, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundBatchStep")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl<I, O, F, Fut> Step for BackgroundBatchStep<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(StepContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<O>> + Send + 'static,
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
        let func = self.func.clone();
        let state = self.lifecycle.state_cell();
        let name = self.name.clone();
        let task_ctx = ctx.clone();

        let task = async move {
            let timer = SpanTimer::start(&name);
            let mut failures = 0usize;

            for (index, input) in inputs.into_iter().enumerate() {
                let outcome = func(task_ctx.clone(), input).await;
                if outcome.is_err() {
                    failures += 1;
                }
                trace!(step = %name, index, ok = outcome.is_ok(), "Batch element produced");
                if let Err(err) = producer.produce(outcome).await {
                    warn!(step = %name, index, error = %err, "Failed to enqueue result");
                }
            }
            lifecycle::record(&name, &state, ExecutionState::Finished);

            producer.close();
            lifecycle::record(&name, &state, ExecutionState::Closed);

            debug!(step = %name, count, failures, duration_ms = timer.finish(), "Background batch step finished");
        };

        self.lifecycle.launch(&self.name, task)?;
        debug!(step = %self.name, run_id = %ctx.run_id(), count, "Background batch step started");
        Ok(handle)
    }

    async fn close(&mut self, ctx: &StepContext) -> Result<(), StepError> {
        self.lifecycle.join(&self.name, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Earlier inputs sleep longer; order must still follow the input.
        let mut step = BackgroundBatchStep::new("ordered", |_ctx, ms: u64| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(ms)
        });
        let ctx = StepContext::new();

        let handle = step.start(&ctx, vec![30, 10, 0]).await.unwrap();
        let values: Vec<u64> = handle
            .drain()
            .map(|r| r.unwrap())
            .collect()
            .await;
        step.close(&ctx).await.unwrap();

        assert_eq!(values, vec![30, 10, 0]);
        assert_eq!(step.state(), ExecutionState::Closed);
    }

    #[tokio::test]
    async fn test_consumer_observes_partial_progress() {
        let release = Arc::new(tokio::sync::Semaphore::new(0));
        let permits = release.clone();
        let mut step = BackgroundBatchStep::new("gated", move |_ctx, x: u32| {
            let permits = permits.clone();
            async move {
                permits
                    .acquire()
                    .await
                    .map_err(|e| StepError::failed(e.to_string()))?
                    .forget();
                Ok::<_, StepError>(x)
            }
        });
        let ctx = StepContext::new();

        let mut handle = step.start(&ctx, vec![1, 2, 3]).await.unwrap();

        release.add_permits(1);
        assert_eq!(handle.next().await.unwrap().unwrap(), 1);
        assert_eq!(step.state(), ExecutionState::Running);

        release.add_permits(2);
        assert_eq!(handle.next().await.unwrap().unwrap(), 2);
        assert_eq!(handle.next().await.unwrap().unwrap(), 3);
        assert!(handle.next().await.is_none());
        step.close(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_elements() {
        let mut step = BackgroundBatchStep::new("odd-fails", |_ctx, x: u32| async move {
            if x % 2 == 1 {
                Err(StepError::failed(format!("odd {x}")))
            } else {
                Ok(x)
            }
        });
        let ctx = StepContext::new();

        let handle = step.start(&ctx, vec![0, 1, 2, 3, 4]).await.unwrap();
        step.close(&ctx).await.unwrap();
        let results = handle.collect().await;

        assert_eq!(results.len(), 5);
        let rendered: Vec<String> = results
            .iter()
            .map(|r| match r {
                Ok(v) => v.to_string(),
                Err(e) => e.to_string(),
            })
            .collect();
        assert_eq!(rendered, vec!["0", "odd 1", "2", "odd 3", "4"]);
    }

    #[tokio::test]
    async fn test_close_without_draining_terminates() {
        let mut step = BackgroundBatchStep::new("undrained", |_ctx, x: u8| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(x)
        });
        let ctx = StepContext::new();

        let handle = step.start(&ctx, vec![1, 2, 3, 4]).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), step.close(&ctx))
            .await
            .expect("close should not deadlock")
            .unwrap();

        assert_eq!(handle.collect().await.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_input_closes_after_task() {
        let mut step = BackgroundBatchStep::new("empty", |_ctx, x: u8| async move { Ok(x) });
        let ctx = StepContext::new();

        let handle = step.start(&ctx, Vec::new()).await.unwrap();
        assert_eq!(handle.capacity(), 0);
        assert!(handle.collect().await.is_empty());

        step.close(&ctx).await.unwrap();
        assert_eq!(step.state(), ExecutionState::Closed);
    }

    #[tokio::test]
    async fn test_handle_capacity_matches_input_length() {
        let mut step = BackgroundBatchStep::new("sized", |_ctx, x: u8| async move { Ok(x) });
        let ctx = StepContext::new();

        let handle = step.start(&ctx, vec![1, 2, 3]).await.unwrap();
        assert_eq!(handle.capacity(), 3);
        step.close(&ctx).await.unwrap();
        assert_eq!(handle.collect().await.len(), 3);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let mut step = BackgroundBatchStep::new("once", |_ctx, x: u8| async move { Ok(x) });
        let ctx = StepContext::new();

        let _handle = step.start(&ctx, vec![1]).await.unwrap();
        assert!(matches!(
            step.start(&ctx, vec![2]).await,
            Err(StepError::AlreadyStarted)
        ));
        step.close(&ctx).await.unwrap();
    }
}
