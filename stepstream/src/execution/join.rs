//! Join counter for the background tasks of one step instance.

use crate::errors::StepError;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

/// Tracks outstanding background tasks so `close` can wait for them.
///
/// The counter is decremented when a task finishes, including by panic.
#[derive(Default)]
pub struct JoinCounter {
    /// Number of tasks that have not finished yet.
    outstanding: Arc<AtomicUsize>,
    /// Handles to spawned tasks not yet joined.
    handles: Vec<(String, JoinHandle<()>)>,
}

/// Decrements the shared counter when the task future is dropped.
struct Completion(Arc<AtomicUsize>);

impl Drop for Completion {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl JoinCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a task on the current tokio runtime and counts it.
    pub fn spawn<Fut>(&mut self, name: &str, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let completion = Completion(self.outstanding.clone());
        let handle = tokio::spawn(async move {
            let _completion = completion;
            task.await;
        });

        self.handles.push((name.to_string(), handle));
    }

    /// Waits until every spawned task has finished.
    ///
    /// Returns the first panic observed, after joining all tasks. A handle is
    /// released only once its task has finished, so a `wait` dropped midway
    /// can be repeated.
    pub async fn wait(&mut self) -> Result<(), StepError> {
        let mut first_error = None;

        while let Some((_, handle)) = self.handles.last_mut() {
            let joined = handle.await;
            let Some((name, _)) = self.handles.pop() else {
                break;
            };
            if let Err(join_error) = joined {
                let message = panic_message(join_error);
                warn!(task = %name, error = %message, "Background task did not complete");
                first_error.get_or_insert(StepError::TaskPanicked(message));
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Returns the number of tasks still running.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Returns the number of spawned tasks not yet joined by [`wait`](Self::wait).
    #[must_use]
    pub fn pending_joins(&self) -> usize {
        self.handles.len()
    }
}

fn panic_message(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task was aborted".to_string();
    }

    let payload = error.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl std::fmt::Debug for JoinCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinCounter")
            .field("outstanding", &self.outstanding())
            .field("pending_joins", &self.pending_joins())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_on_empty_counter() {
        let mut counter = JoinCounter::new();
        assert!(counter.wait().await.is_ok());
        assert_eq!(counter.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_wait_joins_slow_task() {
        let mut counter = JoinCounter::new();
        let done = Arc::new(AtomicUsize::new(0));
        let done_clone = done.clone();

        counter.spawn("slow", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            done_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.pending_joins(), 1);
        counter.wait().await.unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(counter.outstanding(), 0);
        assert_eq!(counter.pending_joins(), 0);
    }

    #[tokio::test]
    async fn test_interrupted_wait_can_be_repeated() {
        let mut counter = JoinCounter::new();
        let done = Arc::new(AtomicUsize::new(0));
        let done_clone = done.clone();

        counter.spawn("slow", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            done_clone.fetch_add(1, Ordering::SeqCst);
        });

        let interrupted = tokio::time::timeout(Duration::from_millis(5), counter.wait()).await;
        assert!(interrupted.is_err());
        assert_eq!(counter.pending_joins(), 1);

        counter.wait().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(counter.pending_joins(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_still_decrements() {
        let mut counter = JoinCounter::new();
        counter.spawn("explodes", async {
            panic!("kaboom");
        });

        let err = counter.wait().await.unwrap_err();
        assert!(matches!(err, StepError::TaskPanicked(ref msg) if msg == "kaboom"));
        assert_eq!(counter.outstanding(), 0);
    }
}
