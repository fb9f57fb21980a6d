//! Read end of a completion channel.

use super::{BlockingDrain, Drain};
use crate::errors::{Outcome, StepError};
use tokio::sync::mpsc;

/// An owned, single-consumer stream of results returned by `start`.
///
/// Items arrive in production order. Once the producer has closed the channel
/// and every queued item has been read, the handle reports end-of-stream.
#[derive(Debug)]
pub struct CompletionHandle<T> {
    ready: Option<Outcome<T>>,
    rx: mpsc::Receiver<Outcome<T>>,
    capacity: usize,
}

impl<T> CompletionHandle<T> {
    pub(super) fn new(rx: mpsc::Receiver<Outcome<T>>, capacity: usize) -> Self {
        Self {
            ready: None,
            rx,
            capacity,
        }
    }

    /// Creates an already-closed handle holding one value.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Creates an already-closed handle holding one error.
    #[must_use]
    pub fn rejected(error: StepError) -> Self {
        Self::settled(Err(error))
    }

    fn settled(outcome: Outcome<T>) -> Self {
        let (_, rx) = mpsc::channel(1);
        Self {
            ready: Some(outcome),
            rx,
            capacity: 1,
        }
    }

    /// Returns the number of results the handle was sized for.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receives the next result, waiting while the channel is empty and open.
    ///
    /// Returns `None` once the channel is closed and empty.
    pub async fn next(&mut self) -> Option<Outcome<T>> {
        if let Some(outcome) = self.ready.take() {
            return Some(outcome);
        }
        self.rx.recv().await
    }

    /// Consumes the handle into a lazy stream of results.
    #[must_use]
    pub fn drain(self) -> Drain<T> {
        Drain::new(self.ready, self.rx)
    }

    /// Consumes the handle into a blocking iterator.
    ///
    /// Intended for synchronous consumers running outside the tokio runtime;
    /// iterating from inside an async context panics.
    #[must_use]
    pub fn into_blocking_iter(self) -> BlockingDrain<T> {
        BlockingDrain::new(self.ready, self.rx)
    }

    /// Reads every result until end-of-stream.
    pub async fn collect(mut self) -> Vec<Outcome<T>> {
        let mut results = Vec::with_capacity(self.capacity);
        while let Some(outcome) = self.next().await {
            results.push(outcome);
        }
        results
    }
}
