//! Observable execution state of a background step.

use crate::errors::StepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a background step.
///
/// States only ever advance by one: `NotStarted -> Running -> Finished -> Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExecutionState {
    /// `start` has not been called.
    #[default]
    NotStarted = 0,
    /// The wrapped function is executing.
    Running = 1,
    /// The wrapped function returned; its result may not be enqueued yet.
    Finished = 2,
    /// The completion handle has been closed. Terminal.
    Closed = 3,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl ExecutionState {
    /// Returns the only state this state may be entered from.
    #[must_use]
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::NotStarted => None,
            Self::Running => Some(Self::NotStarted),
            Self::Finished => Some(Self::Running),
            Self::Closed => Some(Self::Finished),
        }
    }

    /// Returns true once the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::Finished,
            _ => Self::Closed,
        }
    }
}

/// Atomically updated holder of an [`ExecutionState`].
///
/// Written by the background task and read from any thread.
#[derive(Default)]
pub struct StateCell {
    raw: AtomicU8,
}

impl StateCell {
    /// Creates a cell in `NotStarted`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn load(&self) -> ExecutionState {
        ExecutionState::from_u8(self.raw.load(Ordering::Acquire))
    }

    /// Advances to `to` from its predecessor.
    ///
    /// Fails without modifying the cell if the current state is not the
    /// predecessor of `to`.
    pub fn advance(&self, to: ExecutionState) -> Result<(), StepError> {
        let Some(from) = to.predecessor() else {
            return Err(StepError::InvalidTransition {
                from: self.load(),
                to,
            });
        };

        self.raw
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| StepError::InvalidTransition {
                from: ExecutionState::from_u8(actual),
                to,
            })
    }

    /// Moves straight to `Closed`, returning the state it replaced.
    ///
    /// Only used when the background task died before closing its handle.
    pub(crate) fn force_closed(&self) -> ExecutionState {
        ExecutionState::from_u8(self.raw.swap(ExecutionState::Closed as u8, Ordering::AcqRel))
    }
}

impl fmt::Debug for StateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateCell").field(&self.load()).finish()
    }
}
