//! The cancellable context threaded through step execution.
//!
//! This module provides:
//! - `CancellationToken` for cooperative cancellation
//! - `StepContext`, the value handed to `start`, `close` and every wrapped
//!   background function

mod step_context;
mod token;

pub use step_context::StepContext;
pub use token::{CancelCallback, CancellationToken};
