//! Write end of a completion channel.

use crate::errors::{Outcome, StepError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// The producing end of a completion channel.
///
/// There is exactly one producer per channel; it is neither `Clone` nor
/// shareable by reference across writers, since producing needs `&mut self`.
/// Each slot can be filled once. Dropping the producer closes the channel just
/// like [`close`](Self::close).
#[derive(Debug)]
pub struct Producer<T> {
    tx: mpsc::Sender<Outcome<T>>,
    capacity: usize,
    remaining: usize,
}

impl<T> Producer<T> {
    pub(super) fn new(tx: mpsc::Sender<Outcome<T>>, capacity: usize) -> Self {
        Self {
            tx,
            capacity,
            remaining: capacity,
        }
    }

    /// Returns the number of slots the channel was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of slots not yet filled.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Enqueues one result.
    ///
    /// Never waits on the consumer, since every slot was reserved up front. If
    /// the consumer has gone away the result is discarded.
    pub async fn produce(&mut self, outcome: Outcome<T>) -> Result<(), StepError> {
        self.claim_slot()?;
        if self.tx.send(outcome).await.is_err() {
            debug!("Completion handle dropped, discarding result");
        }
        Ok(())
    }

    /// Enqueues one result from synchronous code.
    pub fn try_produce(&mut self, outcome: Outcome<T>) -> Result<(), StepError> {
        self.claim_slot()?;
        match self.tx.try_send(outcome) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => {
                debug!("Completion handle dropped, discarding result");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(StepError::QueueOverflow {
                capacity: self.capacity,
            }),
        }
    }

    /// Closes the channel. The consumer sees end-of-stream once it has read
    /// everything already enqueued.
    pub fn close(self) {
        drop(self);
    }

    fn claim_slot(&mut self) -> Result<(), StepError> {
        if self.remaining == 0 {
            return Err(StepError::QueueOverflow {
                capacity: self.capacity,
            });
        }
        self.remaining -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::channel::completion_channel;
    use crate::errors::StepError;

    #[tokio::test]
    async fn test_produce_within_capacity() {
        let (mut producer, mut handle) = completion_channel::<u32>(2);
        producer.produce(Ok(1)).await.unwrap();
        producer.try_produce(Ok(2)).unwrap();
        assert_eq!(producer.remaining(), 0);
        producer.close();

        assert_eq!(handle.next().await.unwrap().unwrap(), 1);
        assert_eq!(handle.next().await.unwrap().unwrap(), 2);
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn test_overflow_is_reported() {
        let (mut producer, _handle) = completion_channel::<u32>(1);
        producer.produce(Ok(1)).await.unwrap();

        let err = producer.produce(Ok(2)).await.unwrap_err();
        assert!(matches!(err, StepError::QueueOverflow { capacity: 1 }));
        assert!(producer.try_produce(Ok(3)).is_err());
    }

    #[tokio::test]
    async fn test_zero_capacity_only_closes() {
        let (mut producer, handle) = completion_channel::<u32>(0);
        assert!(producer.try_produce(Ok(1)).is_err());
        producer.close();

        assert!(handle.collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_produce_after_consumer_dropped_is_discarded() {
        let (mut producer, handle) = completion_channel::<u32>(1);
        drop(handle);
        assert!(producer.produce(Ok(7)).await.is_ok());
    }
}
