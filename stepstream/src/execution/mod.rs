//! Execution bookkeeping shared by the background step variants.
//!
//! This module provides:
//! - `ExecutionState` and its atomic `StateCell`
//! - `JoinCounter` for waiting on outstanding background tasks

mod join;
mod state;

pub use join::JoinCounter;
pub use state::{ExecutionState, StateCell};
