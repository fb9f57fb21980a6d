//! Test assertions for step outcomes.

use crate::errors::Outcome;
use std::fmt::Debug;

/// Asserts that the outcome is a success.
pub fn assert_outcome_ok<T: Debug>(outcome: &Outcome<T>) {
    assert!(outcome.is_ok(), "Expected success, got: {outcome:?}");
}

/// Asserts that the outcome is a failure.
pub fn assert_outcome_err<T: Debug>(outcome: &Outcome<T>) {
    assert!(outcome.is_err(), "Expected failure, got: {outcome:?}");
}

/// Asserts that the outcome is a success carrying `expected`.
pub fn assert_outcome_value<T: Debug + PartialEq>(outcome: &Outcome<T>, expected: &T) {
    match outcome {
        Ok(value) => assert_eq!(
            value, expected,
            "Expected value {expected:?}, got {value:?}"
        ),
        Err(err) => panic!("Expected value {expected:?}, got error: {err}"),
    }
}

/// Asserts that the outcome is a failure whose message is `expected`.
pub fn assert_outcome_message<T: Debug>(outcome: &Outcome<T>, expected: &str) {
    match outcome {
        Ok(value) => panic!("Expected error '{expected}', got value: {value:?}"),
        Err(err) => assert_eq!(
            err.to_string(),
            expected,
            "Expected error '{expected}', got '{err}'"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepError;

    #[test]
    fn test_assert_outcome_ok() {
        assert_outcome_ok(&Ok::<_, StepError>(1));
    }

    #[test]
    #[should_panic(expected = "Expected success")]
    fn test_assert_outcome_ok_fails() {
        assert_outcome_ok::<u8>(&Err(StepError::failed("boom")));
    }

    #[test]
    fn test_assert_outcome_err() {
        assert_outcome_err::<u8>(&Err(StepError::failed("boom")));
    }

    #[test]
    fn test_assert_outcome_value() {
        assert_outcome_value(&Ok::<_, StepError>(5usize), &5);
    }

    #[test]
    #[should_panic(expected = "Expected value")]
    fn test_assert_outcome_value_on_error() {
        assert_outcome_value::<usize>(&Err(StepError::failed("boom")), &5);
    }

    #[test]
    fn test_assert_outcome_message() {
        assert_outcome_message::<u8>(&Err(StepError::failed("boom")), "boom");
    }
}
