//! Engine state shared between a test execution and every double created for it.
//!
//! A [`MockContext`] owns the pending-stub marker, the invocation log and the stub table. It is
//! passed explicitly to doubles, to the test body and to the validator, so two executions with
//! two contexts never observe each other's state.

use std::any::Any;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::double::DoubleCore;
use crate::errors::InvalidUsageError;

/// Identity of a double within one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoubleId(u64);

impl DoubleId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One recorded call on a double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub double: DoubleId,
    pub double_name: Arc<str>,
    pub method: &'static str,
    /// `Debug` rendering of the arguments; empty for argument-less calls.
    pub args: String,
}

impl Invocation {
    /// Whether `other` is the same call (same double, method and arguments).
    pub fn matches(&self, other: &Invocation) -> bool {
        self.double == other.double && self.method == other.method && self.args == other.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.double_name, self.method, self.args)
    }
}

/// A stub that was registered but never answered a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedStub {
    pub invocation: Invocation,
    pub location: String,
}

impl fmt::Display for UnusedStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (stubbed at {})", self.invocation, self.location)
    }
}

#[derive(Clone)]
pub(crate) enum Answer {
    Return(Arc<dyn Any + Send + Sync>),
    Panic(String),
}

pub(crate) struct Stub {
    pub(crate) invocation: Invocation,
    pub(crate) answer: Answer,
    pub(crate) used: bool,
    pub(crate) location: &'static Location<'static>,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingStub {
    pub(crate) ticket: u64,
    pub(crate) invocation: Invocation,
    pub(crate) location: &'static Location<'static>,
}

impl PendingStub {
    pub(crate) fn into_error(self) -> InvalidUsageError {
        InvalidUsageError::UnfinishedStubbing {
            double: self.invocation.double_name.to_string(),
            method: self.invocation.method,
            args: self.invocation.args,
            location: self.location.to_string(),
        }
    }
}

#[derive(Default)]
pub(crate) struct EngineState {
    pub(crate) next_double: u64,
    pub(crate) next_ticket: u64,
    pub(crate) invocations: Vec<Invocation>,
    /// Most recent invocation not yet claimed by `when`.
    pub(crate) last_unstubbed: Option<Invocation>,
    pub(crate) pending: Option<PendingStub>,
    pub(crate) stubs: Vec<Stub>,
}

/// Handle to one execution's double-engine state.
///
/// Cloning is cheap and every clone refers to the same state.
#[derive(Clone, Default)]
pub struct MockContext {
    pub(crate) state: Arc<Mutex<EngineState>>,
}

impl MockContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new double identity named `name`.
    ///
    /// ## Notes
    /// - Names are for messages only; identity is the returned core's [`DoubleId`].
    pub fn new_double(&self, name: impl Into<Arc<str>>) -> DoubleCore {
        let id = {
            let mut state = self.state.lock();
            state.next_double += 1;
            DoubleId(state.next_double)
        };
        let name = name.into();
        tracing::debug!(double = %name, id = id.get(), "double created");
        DoubleCore::new(id, name, self.clone())
    }

    /// Record `invocation` and return the answer of the matching stub, if any.
    ///
    /// The most recently registered stub for a call wins.
    pub(crate) fn record(&self, invocation: Invocation) -> Option<Answer> {
        let mut state = self.state.lock();
        tracing::trace!(call = %invocation, "invocation recorded");
        let answer = state
            .stubs
            .iter_mut()
            .rev()
            .find(|stub| stub.invocation.matches(&invocation))
            .map(|stub| {
                stub.used = true;
                stub.answer.clone()
            });
        state.invocations.push(invocation.clone());
        state.last_unstubbed = Some(invocation);
        answer
    }

    /// Check that no stubbing was left open.
    ///
    /// ## Returns
    /// - `Ok(())` when the pending-stub marker is absent.
    /// - `Err(InvalidUsageError::UnfinishedStubbing)` otherwise.
    ///
    /// ## Notes
    /// - Reporting clears the marker, so a leftover stub is reported exactly once.
    pub fn validate(&self) -> Result<(), InvalidUsageError> {
        let pending = self.state.lock().pending.take();
        match pending {
            Some(pending) => {
                tracing::debug!(call = %pending.invocation, "unfinished stubbing found during validation");
                Err(pending.into_error())
            }
            None => Ok(()),
        }
    }

    /// Whether a `when(..)` is currently open.
    pub fn has_pending_stub(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// All recorded invocations, in call order. Calls claimed by `when` are not included.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().invocations.clone()
    }

    /// Recorded invocations on one double.
    pub fn invocations_of(&self, double: &DoubleCore) -> Vec<Invocation> {
        self.state
            .lock()
            .invocations
            .iter()
            .filter(|invocation| invocation.double == double.id())
            .cloned()
            .collect()
    }

    /// Stubs that never answered a call, in registration order.
    pub fn unused_stubs(&self) -> Vec<UnusedStub> {
        self.state
            .lock()
            .stubs
            .iter()
            .filter(|stub| !stub.used)
            .map(|stub| UnusedStub {
                invocation: stub.invocation.clone(),
                location: stub.location.to_string(),
            })
            .collect()
    }

    /// Forget invocations, stubs and any pending stubbing. Double identities stay valid.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.invocations.clear();
        state.last_unstubbed = None;
        state.pending = None;
        state.stubs.clear();
    }

    /// Whether `self` and `other` share state.
    pub fn same_context(&self, other: &MockContext) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for MockContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockContext")
            .field("doubles", &state.next_double)
            .field("invocations", &state.invocations.len())
            .field("stubs", &state.stubs.len())
            .field("pending", &state.pending.as_ref().map(|p| p.invocation.to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_consistent() {
        let ctx = MockContext::new();
        assert!(ctx.validate().is_ok());
        assert!(!ctx.has_pending_stub());
        assert!(ctx.invocations().is_empty());
        assert!(ctx.unused_stubs().is_empty());
    }

    #[test]
    fn test_double_ids_are_unique_per_context() {
        let ctx = MockContext::new();
        let a = ctx.new_double("a");
        let b = ctx.new_double("b");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = MockContext::new();
        let clone = ctx.clone();
        let double = clone.new_double("svc");
        let _: i64 = double.invoke("count", ());
        assert_eq!(ctx.invocations().len(), 1);
        assert!(ctx.same_context(&clone));
        assert!(!ctx.same_context(&MockContext::new()));
    }

    #[test]
    fn test_reset_clears_pending_and_log() {
        let ctx = MockContext::new();
        let double = ctx.new_double("svc");
        let value: String = double.invoke("name", ());
        let _open = ctx.when(value).unwrap();
        assert!(ctx.has_pending_stub());

        ctx.reset();
        assert!(!ctx.has_pending_stub());
        assert!(ctx.invocations().is_empty());
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_invocation_display() {
        let ctx = MockContext::new();
        let double = ctx.new_double("repo");
        let _: Option<u32> = double.invoke("find", 7_u32);
        let _: () = double.invoke("flush", ());
        let rendered: Vec<String> = ctx.invocations().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["repo.find(7)", "repo.flush()"]);
    }
}
