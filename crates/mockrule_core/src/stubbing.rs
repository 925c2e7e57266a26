//! `when(..).then_*(..)` stubbing.
//!
//! `when` claims the most recent invocation and opens a pending stub; the returned
//! [`OngoingStubbing`] closes it. Dropping the `OngoingStubbing` without answering leaves the
//! stub pending, which the validator reports at teardown.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::Arc;

use crate::context::{Answer, MockContext, PendingStub, Stub};
use crate::errors::InvalidUsageError;

impl MockContext {
    /// Start stubbing the call that produced `call_result`.
    ///
    /// ## Parameters
    /// - `call_result`: the value returned by a double's method; only its type is used.
    ///
    /// ## Returns
    /// - An [`OngoingStubbing`] to be completed with `then_return` or `then_panic`.
    /// - `Err(UnfinishedStubbing)` if an earlier stub is still open (the earlier one is cleared).
    /// - `Err(MissingInvocation)` if no double was called since the last `when`.
    #[track_caller]
    pub fn when<R>(&self, call_result: R) -> Result<OngoingStubbing<R>, InvalidUsageError> {
        let location = Location::caller();
        drop(call_result);

        let mut state = self.state.lock();
        if let Some(previous) = state.pending.take() {
            return Err(previous.into_error());
        }
        let Some(invocation) = state.last_unstubbed.take() else {
            return Err(InvalidUsageError::MissingInvocation {
                location: location.to_string(),
            });
        };

        // The call made only to name the stub target is not part of the test's interactions.
        if state.invocations.last().is_some_and(|last| last.matches(&invocation)) {
            state.invocations.pop();
        }

        state.next_ticket += 1;
        let ticket = state.next_ticket;
        tracing::debug!(call = %invocation, %location, "stubbing started");
        state.pending = Some(PendingStub {
            ticket,
            invocation,
            location,
        });

        Ok(OngoingStubbing {
            context: self.clone(),
            ticket,
            _returns: PhantomData,
        })
    }

    fn complete_stub(&self, ticket: u64, answer: Answer) {
        let mut state = self.state.lock();
        match state.pending.take() {
            Some(pending) if pending.ticket == ticket => {
                tracing::debug!(call = %pending.invocation, "stubbing completed");
                state.stubs.push(Stub {
                    invocation: pending.invocation,
                    answer,
                    used: false,
                    location: pending.location,
                });
            }
            other => {
                // Already reported (validated, reset or superseded); nothing to complete.
                state.pending = other;
                tracing::warn!(ticket, "answer supplied for a stubbing that is no longer pending");
            }
        }
    }
}

/// An open stub waiting for its answer.
#[must_use = "the stub stays pending until `then_return` or `then_panic` is called"]
pub struct OngoingStubbing<R> {
    context: MockContext,
    ticket: u64,
    _returns: PhantomData<fn(R)>,
}

impl<R> OngoingStubbing<R>
where
    R: Send + Sync + 'static,
{
    /// Answer the stubbed call with `value`.
    pub fn then_return(self, value: R) {
        let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
        self.context.complete_stub(self.ticket, Answer::Return(value));
    }

    /// Answer the stubbed call by panicking with `message`.
    pub fn then_panic(self, message: impl Into<String>) {
        self.context.complete_stub(self.ticket, Answer::Panic(message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_when_then_return_answers_matching_call() {
        let ctx = MockContext::new();
        let double = ctx.new_double("greeter");
        ctx.when(double.invoke::<String>("greet", "ada"))
            .unwrap()
            .then_return("hello ada".to_string());

        assert_eq!(double.invoke::<String>("greet", "ada"), "hello ada");
        assert_eq!(double.invoke::<String>("greet", "bob"), "");
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_open_stub_is_pending_until_answered() {
        let ctx = MockContext::new();
        let double = ctx.new_double("greeter");
        let open = ctx.when(double.invoke::<String>("greet", ())).unwrap();
        assert!(ctx.has_pending_stub());
        open.then_return(String::from("hi"));
        assert!(!ctx.has_pending_stub());
    }

    #[test]
    fn test_when_without_invocation_is_rejected() {
        let ctx = MockContext::new();
        let err = ctx.when(5).err().unwrap();
        assert!(matches!(err, InvalidUsageError::MissingInvocation { .. }));
        assert!(!ctx.has_pending_stub());
    }

    #[test]
    fn test_when_while_pending_reports_previous_stub() {
        let ctx = MockContext::new();
        let double = ctx.new_double("repo");
        let _forgotten = ctx.when(double.invoke::<u32>("count", ())).unwrap();

        let err = ctx.when(double.invoke::<u32>("count", ())).err().unwrap();
        match err {
            InvalidUsageError::UnfinishedStubbing { double, method, .. } => {
                assert_eq!(double, "repo");
                assert_eq!(method, "count");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!ctx.has_pending_stub());
    }

    #[test]
    fn test_stubbing_call_is_not_logged_as_interaction() {
        let ctx = MockContext::new();
        let double = ctx.new_double("repo");
        ctx.when(double.invoke::<u32>("count", ())).unwrap().then_return(3);
        assert!(ctx.invocations().is_empty());

        assert_eq!(double.invoke::<u32>("count", ()), 3);
        assert_eq!(ctx.invocations().len(), 1);
    }

    #[test]
    fn test_late_answer_after_validation_is_ignored() {
        let ctx = MockContext::new();
        let double = ctx.new_double("repo");
        let open = ctx.when(double.invoke::<u32>("count", ())).unwrap();
        assert!(ctx.validate().is_err());

        open.then_return(9);
        assert!(!ctx.has_pending_stub());
        assert_eq!(double.invoke::<u32>("count", ()), 0);
    }

    #[test]
    fn test_latest_stub_wins() {
        let ctx = MockContext::new();
        let double = ctx.new_double("repo");
        ctx.when(double.invoke::<u32>("count", ())).unwrap().then_return(1);
        ctx.when(double.invoke::<u32>("count", ())).unwrap().then_return(2);
        assert_eq!(double.invoke::<u32>("count", ()), 2);
    }
}
