//! Deferred validation and outcome precedence.
//!
//! [`MockContext::validate`](mockrule_core::MockContext::validate) runs once after the body,
//! whatever the body did. When both fail, the body's failure is what the test reports; the
//! validation failure is logged and dropped.

use std::any::Any;
use std::panic;

use mockrule_core::InvalidUsageError;

use crate::errors::{BodyError, RuleError};

/// How the body finished.
pub(crate) enum BodyOutcome {
    Passed,
    Failed(BodyError),
    Panicked(Box<dyn Any + Send>),
}

/// Combine the body outcome with the validation result.
///
/// ## Returns
/// - `Ok(())` when both passed.
/// - `RuleError::Body` when the body returned an error, regardless of validation.
/// - `RuleError::InvalidUsage` when only validation failed.
///
/// ## Panics
/// - Re-raises the body's panic payload unchanged when the body panicked.
pub(crate) fn settle(outcome: BodyOutcome, validation: Result<(), InvalidUsageError>) -> Result<(), RuleError> {
    match (outcome, validation) {
        (BodyOutcome::Passed, Ok(())) => Ok(()),
        (BodyOutcome::Passed, Err(usage)) => Err(RuleError::InvalidUsage(usage)),
        (BodyOutcome::Failed(body), Ok(())) => Err(RuleError::Body(body)),
        (BodyOutcome::Failed(body), Err(usage)) => {
            tracing::warn!(error = %usage, body_error = %body, "discarding validation failure after body failure");
            Err(RuleError::Body(body))
        }
        (BodyOutcome::Panicked(payload), validation) => {
            if let Err(usage) = validation {
                tracing::warn!(
                    error = %usage,
                    panic = panic_message(payload.as_ref()),
                    "discarding validation failure after body panic"
                );
            }
            panic::resume_unwind(payload)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "<non-string panic payload>"
    }
}
