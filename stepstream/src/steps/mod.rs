//! Step trait and execution strategies.
//!
//! Steps are the units of work that callers chain into pipelines. Every step
//! follows the same protocol: `start` returns a [`CompletionHandle`] right
//! away, the caller drains it at its own pace, and `close` guarantees that no
//! background task is still writing to it.
//!
//! | Variant | Runs on | Results |
//! |---------|---------|---------|
//! | [`ImmediateStep`] | caller | one |
//! | [`BackgroundStep`] | spawned task | one |
//! | [`ImmediateBatchStep`] | caller | one per input, in order |
//! | [`BackgroundBatchStep`] | spawned task | one per input, streamed in order |

mod background;
mod background_batch;
mod immediate;
mod immediate_batch;
pub(crate) mod lifecycle;

pub use background::BackgroundStep;
pub use background_batch::BackgroundBatchStep;
pub use immediate::ImmediateStep;
pub use immediate_batch::ImmediateBatchStep;

use crate::channel::CompletionHandle;
use crate::context::StepContext;
use crate::errors::StepError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline steps.
///
/// Errors raised by the wrapped work travel inside the handle's results.
/// `start` itself fails only for setup errors (missing settings, rejected
/// input) and lifecycle misuse.
///
/// The context is forwarded to the work as-is; cancelling it does not stop a
/// step unless the work checks it.
#[async_trait]
pub trait Step: Send + Debug {
    /// Input accepted by `start`.
    type Input: Send + 'static;

    /// Value carried by each successful result.
    type Output: Send + 'static;

    /// Returns the name of the step.
    fn name(&self) -> &str;

    /// Begins one execution and returns its completion handle.
    async fn start(
        &mut self,
        ctx: &StepContext,
        input: Self::Input,
    ) -> Result<CompletionHandle<Self::Output>, StepError>;

    /// Releases the step, waiting for any background work to finish.
    ///
    /// Must be called once after the caller is done with the handle.
    async fn close(&mut self, ctx: &StepContext) -> Result<(), StepError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Outcome;
    use pretty_assertions::assert_eq;

    fn len_of(s: String) -> Outcome<usize> {
        Ok(s.len())
    }

    #[tokio::test]
    async fn test_variants_share_one_interface() {
        let mut steps: Vec<Box<dyn Step<Input = String, Output = usize>>> = vec![
            Box::new(ImmediateStep::new("inline", len_of)),
            Box::new(BackgroundStep::new("spawned", |_ctx, s: String| async move {
                Ok(s.len())
            })),
        ];

        let ctx = StepContext::new();
        for step in &mut steps {
            let handle = step.start(&ctx, "hello".to_string()).await.unwrap();
            step.close(&ctx).await.unwrap();

            let values: Vec<usize> = handle
                .collect()
                .await
                .into_iter()
                .map(|r| r.unwrap())
                .collect();
            assert_eq!(values, vec![5], "step {}", step.name());
        }
    }
}
