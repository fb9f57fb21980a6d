//! Draining adapters over a completion handle.

use crate::errors::Outcome;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Lazy, finite, non-restartable stream over a completion handle.
#[derive(Debug)]
pub struct Drain<T> {
    ready: Option<Outcome<T>>,
    rx: mpsc::Receiver<Outcome<T>>,
}

impl<T> Drain<T> {
    pub(super) fn new(ready: Option<Outcome<T>>, rx: mpsc::Receiver<Outcome<T>>) -> Self {
        Self { ready, rx }
    }
}

impl<T> Unpin for Drain<T> {}

impl<T> Stream for Drain<T> {
    type Item = Outcome<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(outcome) = self.ready.take() {
            return Poll::Ready(Some(outcome));
        }
        self.rx.poll_recv(cx)
    }
}

/// Blocking iterator over a completion handle.
#[derive(Debug)]
pub struct BlockingDrain<T> {
    ready: Option<Outcome<T>>,
    rx: mpsc::Receiver<Outcome<T>>,
}

impl<T> BlockingDrain<T> {
    pub(super) fn new(ready: Option<Outcome<T>>, rx: mpsc::Receiver<Outcome<T>>) -> Self {
        Self { ready, rx }
    }
}

impl<T> Iterator for BlockingDrain<T> {
    type Item = Outcome<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(outcome) = self.ready.take() {
            return Some(outcome);
        }
        self.rx.blocking_recv()
    }
}

#[cfg(test)]
mod tests {
    use crate::channel::completion_channel;
    use crate::errors::StepError;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_drain_stream_preserves_order() {
        let (mut producer, handle) = completion_channel::<u32>(3);
        producer.try_produce(Ok(1)).unwrap();
        producer.try_produce(Err(StepError::failed("two"))).unwrap();
        producer.try_produce(Ok(3)).unwrap();
        producer.close();

        let results: Vec<_> = handle.drain().collect().await;
        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert_eq!(results[1].as_ref().unwrap_err().to_string(), "two");
        assert_eq!(*results[2].as_ref().unwrap(), 3);
    }

    #[test]
    fn test_blocking_iter_from_sync_code() {
        let (mut producer, handle) = completion_channel::<&str>(2);
        let writer = std::thread::spawn(move || {
            producer.try_produce(Ok("a")).unwrap();
            producer.try_produce(Ok("b")).unwrap();
        });

        let values: Vec<_> = handle
            .into_blocking_iter()
            .map(|outcome| outcome.unwrap())
            .collect();
        writer.join().unwrap();
        assert_eq!(values, vec!["a", "b"]);
    }
}
