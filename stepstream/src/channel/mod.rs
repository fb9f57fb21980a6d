//! Single-producer, single-consumer completion channel.
//!
//! A step hands the read end, [`CompletionHandle`], to its caller and keeps
//! the write end, [`Producer`], for whichever context produces results. Only
//! the producer can close the queue, and closing consumes it.

mod drain;
mod handle;
mod producer;

pub use drain::{BlockingDrain, Drain};
pub use handle::CompletionHandle;
pub use producer::Producer;

use crate::errors::Outcome;
use tokio::sync::mpsc;

/// Creates a completion channel with room for `capacity` results.
///
/// A zero capacity is valid: the producer can only close the channel.
#[must_use]
pub fn completion_channel<T>(capacity: usize) -> (Producer<T>, CompletionHandle<T>) {
    let (tx, rx) = mpsc::channel::<Outcome<T>>(capacity.max(1));
    (Producer::new(tx, capacity), CompletionHandle::new(rx, capacity))
}
