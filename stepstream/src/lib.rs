//! # Stepstream
//!
//! Composable pipeline steps that hand back a completion handle as soon as
//! they start.
//!
//! Stepstream provides:
//!
//! - **One step protocol**: `start` returns a [`CompletionHandle`](channel::CompletionHandle),
//!   `close` waits for background work
//! - **Four execution strategies**: inline or spawned, single value or batch
//! - **Per-element errors**: a failing input never aborts the rest of a batch
//! - **Observable state**: background steps expose `NotStarted`, `Running`,
//!   `Finished` and `Closed`
//! - **Provider steps**: chat completions behind a validated settings layer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepstream::prelude::*;
//!
//! let mut step = BackgroundBatchStep::new("lengths", |_ctx, s: String| async move {
//!     Ok(s.len())
//! });
//! let ctx = StepContext::new();
//!
//! let handle = step.start(&ctx, vec!["a".into(), "bcd".into()]).await?;
//! let results = handle.collect().await;
//! step.close(&ctx).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod channel;
pub mod context;
pub mod errors;
pub mod execution;
pub mod observability;
pub mod providers;
pub mod settings;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::channel::{completion_channel, CompletionHandle, Producer};
    pub use crate::context::{CancellationToken, StepContext};
    pub use crate::errors::{Outcome, StepError};
    pub use crate::execution::ExecutionState;
    pub use crate::observability::{init_tracing, LogConfig};
    pub use crate::providers::{ChatProvider, ChatStep, Message, Role};
    pub use crate::settings::{ProviderKind, StepSettings};
    pub use crate::steps::{
        BackgroundBatchStep, BackgroundStep, ImmediateBatchStep, ImmediateStep, Step,
    };
}
