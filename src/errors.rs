//! Errors raised while scanning, injecting and running a wrapped test.
//!
//! Every enum derives `thiserror::Error` for composition with `?` and `miette::Diagnostic` for a
//! stable code and optional help text. [`RuleError`] is the single outcome type of
//! [`WrappedTest::invoke`](crate::WrappedTest::invoke).

use miette::Diagnostic;
use thiserror::Error;

pub use mockrule_core::InvalidUsageError;
use mockrule_core::UnusedStub;

use crate::reflect::FieldRole;

/// Whatever a test body returned as its failure, preserved verbatim.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// A fixture whose field table cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ReflectionError {
    #[error("fixture `{fixture}` declares field `{field}` more than once")]
    #[diagnostic(code(mockrule::reflection::duplicate_field))]
    DuplicateField { fixture: &'static str, field: String },

    #[error("{role} `{fixture}.{field}` cannot be accessed: {reason}")]
    #[diagnostic(
        code(mockrule::reflection::inaccessible),
        help("derive `MockFixture` or expose the field through `slot`/`inject_slot`")
    )]
    Inaccessible {
        fixture: &'static str,
        field: String,
        role: FieldRole,
        reason: &'static str,
    },
}

/// The double factory has no way to produce a double of the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no double factory registered for `{type_name}`")]
pub struct UnsupportedTypeError {
    pub type_name: &'static str,
}

/// An injection target could not be built with zero arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{type_name}` {reason}")]
pub struct ConstructionError {
    pub type_name: &'static str,
    pub reason: String,
}

impl ConstructionError {
    pub fn new<T: ?Sized>(reason: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    pub fn no_zero_arg<T: ?Sized>() -> Self {
        Self::new::<T>("has no zero-argument construction path")
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum InjectionError {
    #[error("cannot create a double for `{fixture}.{field}`: {source}")]
    #[diagnostic(
        code(mockrule::injection::unsupported_type),
        help("register a factory for this type with `DoubleRegistry::register`")
    )]
    UnsupportedType {
        fixture: &'static str,
        field: String,
        #[source]
        source: UnsupportedTypeError,
    },

    #[error("cannot construct `{fixture}.{field}`: {source}")]
    #[diagnostic(
        code(mockrule::injection::construction),
        help("initialize the field before the rule runs, or derive `Default` for the target type")
    )]
    Construction {
        fixture: &'static str,
        field: String,
        #[source]
        source: ConstructionError,
    },

    #[error("cannot assign a `{found}` double to `{fixture}.{field}` of type `{expected}`")]
    #[diagnostic(code(mockrule::injection::type_mismatch))]
    TypeMismatch {
        fixture: &'static str,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{fixture}.{field}` was scanned but has no accessor")]
    #[diagnostic(code(mockrule::injection::missing_accessor))]
    MissingAccessor { fixture: &'static str, field: String },

    #[error("cannot scan inject target `{fixture}.{field}`: {source}")]
    #[diagnostic(code(mockrule::injection::target_scan))]
    TargetScan {
        fixture: &'static str,
        field: String,
        #[source]
        source: ReflectionError,
    },
}

/// Outcome of a wrapped test that did not pass.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Reflection(#[from] ReflectionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Injection(#[from] InjectionError),

    /// The body's own failure, displayed and chained as the body reported it.
    #[error(transparent)]
    #[diagnostic(code(mockrule::body))]
    Body(BodyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidUsage(#[from] InvalidUsageError),

    #[error("unnecessary stubbing: {}", describe_stubs(.stubs))]
    #[diagnostic(
        code(mockrule::usage::unnecessary_stubbing),
        help("remove the stubs or lower the rule's strictness")
    )]
    UnnecessaryStubbing { stubs: Vec<UnusedStub> },
}

impl RuleError {
    /// The body's error, if the body is what failed.
    pub fn body_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            RuleError::Body(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn into_body_error(self) -> Result<BodyError, RuleError> {
        match self {
            RuleError::Body(err) => Ok(err),
            other => Err(other),
        }
    }

    pub fn is_invalid_usage(&self) -> bool {
        matches!(self, RuleError::InvalidUsage(_))
    }
}

fn describe_stubs(stubs: &[UnusedStub]) -> String {
    stubs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
