//! Testing utilities for stepstream steps.
//!
//! This module provides:
//! - Recording, failing and slow wrapped functions
//! - A scripted [`ChatProvider`](crate::providers::ChatProvider)
//! - Assertions for outcomes

mod assertions;
mod mocks;

pub use assertions::{
    assert_outcome_err, assert_outcome_message, assert_outcome_ok, assert_outcome_value,
};
pub use mocks::{failing, recording, slow, Recorder, ScriptedProvider};

use crate::errors::{Outcome, StepError};

/// Splits drained outcomes into successes and failures, keeping their order.
///
/// Steps have no aggregate failure signal; callers that want one use this.
pub fn partition_outcomes<T>(outcomes: Vec<Outcome<T>>) -> (Vec<T>, Vec<StepError>) {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }
    (values, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partition_keeps_order() {
        let outcomes = vec![
            Ok(1),
            Err(StepError::failed("a")),
            Ok(3),
            Err(StepError::failed("b")),
        ];
        let (values, errors) = partition_outcomes(outcomes);
        assert_eq!(values, vec![1, 3]);
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }
}
