//! Provide the double engine behind `mockrule`: contexts, stubbing and invocation recording.
//!
//! This crate knows nothing about fixtures, fields or injection. It offers the three surfaces the
//! lifecycle rule consumes:
//! - [`MockContext::new_double`], used by double factories to give each double an identity;
//! - [`DoubleCore::invoke`], the recording behavior every double forwards its calls to;
//! - [`MockContext::validate`], the consistency check run after a test body.
//!
//! ## Notes
//!
//! - There is **no global state**: the pending-stub marker lives in a [`MockContext`], and a test
//!   execution that wants isolation simply uses its own context.
//! - Stubs match calls on double identity, method name and the `Debug` rendering of the
//!   arguments. There are no argument matchers.

pub mod context;
pub mod double;
pub mod errors;
pub mod stubbing;

pub use context::{DoubleId, Invocation, MockContext, UnusedStub};
pub use double::DoubleCore;
pub use errors::InvalidUsageError;
pub use stubbing::OngoingStubbing;
