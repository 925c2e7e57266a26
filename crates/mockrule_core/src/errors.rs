//! Usage errors raised by the double engine.
//!
//! These are the only failures the engine reports on its own: everything else (unknown types,
//! construction problems) belongs to the injection layer in the `mockrule` crate.

use miette::Diagnostic;
use thiserror::Error;

/// A misuse of the stubbing API detected by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum InvalidUsageError {
    /// A `when(..)` was opened but never completed with `then_return` / `then_panic`.
    #[error("unfinished stubbing of `{double}.{method}({args})` started at {location}")]
    #[diagnostic(
        code(mockrule::usage::unfinished_stubbing),
        help(
            "complete the stub with `.then_return(value)` or `.then_panic(message)`; \
             a stub left open usually means the test aborted or the answer was forgotten"
        )
    )]
    UnfinishedStubbing {
        double: String,
        method: &'static str,
        args: String,
        location: String,
    },

    /// `when(..)` was called without a double invocation immediately before it.
    #[error("`when` at {location} was not preceded by a call on a double")]
    #[diagnostic(
        code(mockrule::usage::missing_invocation),
        help("pass the result of a double's method call directly: `ctx.when(double.method(args))`")
    )]
    MissingInvocation { location: String },
}

impl InvalidUsageError {
    /// Whether this error reports a stub left open.
    pub fn is_unfinished_stubbing(&self) -> bool {
        matches!(self, InvalidUsageError::UnfinishedStubbing { .. })
    }
}
