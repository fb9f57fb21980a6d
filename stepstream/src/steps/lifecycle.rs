//! One-shot start/close bookkeeping for the background variants.

use crate::channel::{completion_channel, CompletionHandle};
use crate::context::StepContext;
use crate::errors::{Outcome, StepError};
use crate::execution::{ExecutionState, JoinCounter, StateCell};
use crate::observability::SpanTimer;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: Arc<StateCell>,
    joins: JoinCounter,
    closed: bool,
}

impl Lifecycle {
    pub(crate) fn state(&self) -> ExecutionState {
        self.state.load()
    }

    /// Shared handle for the task to record its own transitions.
    pub(crate) fn state_cell(&self) -> Arc<StateCell> {
        self.state.clone()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.joins.outstanding()
    }

    /// Moves to `Running` and spawns the producing task.
    ///
    /// A second call is rejected and spawns nothing.
    pub(crate) fn launch<Fut>(&mut self, name: &str, task: Fut) -> Result<(), StepError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Err(err) = self.state.advance(ExecutionState::Running) {
            warn!(step = %name, error = %err, "Rejected repeated start");
            return Err(StepError::AlreadyStarted);
        }
        self.joins.spawn(name, task);
        Ok(())
    }

    /// Spawns one task that runs `work`, enqueues its single result and closes
    /// the handle, recording `Finished` and `Closed` along the way.
    pub(crate) fn launch_single<O, W, Fut>(
        &mut self,
        name: &str,
        ctx: &StepContext,
        work: W,
    ) -> Result<CompletionHandle<O>, StepError>
    where
        O: Send + 'static,
        W: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<O>> + Send + 'static,
    {
        let (mut producer, handle) = completion_channel(1);
        let state = self.state_cell();
        let task_name = name.to_string();

        let task = async move {
            let timer = SpanTimer::start(&task_name);
            let outcome = work().await;
            record(&task_name, &state, ExecutionState::Finished);

            let failed = outcome.is_err();
            if let Err(err) = producer.produce(outcome).await {
                warn!(step = %task_name, error = %err, "Failed to enqueue result");
            }
            producer.close();
            record(&task_name, &state, ExecutionState::Closed);

            debug!(step = %task_name, failed, duration_ms = timer.finish(), "Background step finished");
        };

        self.launch(name, task)?;
        debug!(step = %name, run_id = %ctx.run_id(), "Background step started");
        Ok(handle)
    }

    /// Waits for the producing task. Closing the handle is the task's job.
    ///
    /// The step counts as closed only once the wait completes, so a `close`
    /// that was dropped before then can be retried.
    pub(crate) async fn join(&mut self, name: &str, ctx: &StepContext) -> Result<(), StepError> {
        if self.closed {
            return Err(StepError::AlreadyClosed);
        }
        if self.state.load() == ExecutionState::NotStarted {
            return Err(StepError::NotStarted);
        }
        let joined = self.joins.wait().await;
        self.closed = true;

        if let Err(err) = joined {
            let last = self.state.force_closed();
            warn!(
                step = %name,
                run_id = %ctx.run_id(),
                last_state = %last,
                error = %err,
                "Background step closed after task failure"
            );
            return Err(err);
        }

        debug!(step = %name, run_id = %ctx.run_id(), state = %self.state.load(), "Background step closed");
        Ok(())
    }
}

/// Records a transition made by the producing task.
pub(crate) fn record(name: &str, state: &StateCell, to: ExecutionState) {
    if let Err(err) = state.advance(to) {
        warn!(step = %name, error = %err, "Unexpected state transition");
    }
}
