//! The lifecycle wrapper: scan, inject, run the body, validate.
//!
//! ```rust
//! use std::sync::Arc;
//! use mockrule::{DoubleCore, DoubleRegistry, Injectable, MockFixture, MockRule};
//!
//! pub trait Payments {
//!     fn charge(&self, cents: u64) -> bool;
//! }
//!
//! struct PaymentsDouble(DoubleCore);
//!
//! impl Payments for PaymentsDouble {
//!     fn charge(&self, cents: u64) -> bool {
//!         self.0.invoke("charge", cents)
//!     }
//! }
//!
//! #[derive(Default, Injectable)]
//! struct Checkout {
//!     payments: Option<Arc<dyn Payments>>,
//! }
//!
//! #[derive(MockFixture)]
//! struct CheckoutTest {
//!     #[mock]
//!     payments: Option<Arc<dyn Payments>>,
//!     #[inject_mocks]
//!     checkout: Option<Checkout>,
//! }
//!
//! let rule = MockRule::new(
//!     DoubleRegistry::new().with(|core| Arc::new(PaymentsDouble(core)) as Arc<dyn Payments>),
//! );
//! let mut fixture = CheckoutTest { payments: None, checkout: None };
//!
//! rule.apply(
//!     |fixture, ctx| {
//!         let payments = fixture.payments.clone().unwrap();
//!         ctx.when(payments.charge(500))?.then_return(true);
//!
//!         let checkout = fixture.checkout.as_ref().unwrap();
//!         assert!(checkout.payments.as_ref().unwrap().charge(500));
//!         Ok(())
//!     },
//!     &mut fixture,
//! )
//! .invoke()
//! .unwrap();
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use mockrule_core::MockContext;
use parking_lot::Mutex;

use crate::config::{RuleConfig, Strictness};
use crate::errors::{BodyError, RuleError};
use crate::factory::DoubleFactory;
use crate::injector::Injector;
use crate::reflect::MockFixture;
use crate::scanner;
use crate::validator::{self, BodyOutcome};

/// Phases of one wrapped execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Scanned,
    Injected,
    Running,
    Validated,
    Done,
    ErrorExit,
}

impl Phase {
    fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Scanned)
                | (Phase::Idle, Phase::ErrorExit)
                | (Phase::Scanned, Phase::Injected)
                | (Phase::Scanned, Phase::ErrorExit)
                | (Phase::Injected, Phase::Running)
                | (Phase::Running, Phase::Validated)
                | (Phase::Validated, Phase::Done)
                | (Phase::Validated, Phase::ErrorExit)
        )
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(self.can_advance_to(next), "illegal phase transition {self:?} -> {next:?}");
        tracing::debug!(from = ?*self, to = ?next, "phase");
        *self = next;
    }
}

/// Creates doubles for a fixture, runs a test body and validates the double engine afterwards.
///
/// A rule owns one [`MockContext`]. Every execution resets it first, so each execution starts
/// from an empty engine state while doubles left in a fixture by an earlier execution keep
/// recording into the state of the current one. An execution that finds the context already
/// in use (a nested or concurrent run of the same rule) gets a context of its own instead.
pub struct MockRule<D> {
    factory: D,
    config: RuleConfig,
    context: MockContext,
    in_use: Mutex<()>,
}

impl<D: DoubleFactory> MockRule<D> {
    pub fn new(factory: D) -> Self {
        Self::with_config(factory, RuleConfig::default())
    }

    pub fn with_config(factory: D, config: RuleConfig) -> Self {
        Self {
            factory,
            config,
            context: MockContext::new(),
            in_use: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn factory(&self) -> &D {
        &self.factory
    }

    /// The context executions of this rule record into.
    pub fn context(&self) -> &MockContext {
        &self.context
    }

    /// Wrap `body` so that it runs against `instance` once its doubles are in place.
    ///
    /// Nothing happens until [`WrappedTest::invoke`] is called.
    pub fn apply<'r, F, B>(&'r self, body: B, instance: &'r mut F) -> WrappedTest<'r, D, F, B>
    where
        F: MockFixture,
        B: FnOnce(&mut F, &MockContext) -> Result<(), BodyError>,
    {
        WrappedTest {
            rule: self,
            body,
            instance,
            context: None,
        }
    }

    /// `apply` followed by `invoke`.
    pub fn run<F, B>(&self, body: B, instance: &mut F) -> Result<(), RuleError>
    where
        F: MockFixture,
        B: FnOnce(&mut F, &MockContext) -> Result<(), BodyError>,
    {
        self.apply(body, instance).invoke()
    }
}

impl<D> fmt::Debug for MockRule<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRule")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// A test body bound to its fixture, ready to run.
#[must_use = "a wrapped test does nothing until `invoke` is called"]
pub struct WrappedTest<'r, D, F, B> {
    rule: &'r MockRule<D>,
    body: B,
    instance: &'r mut F,
    context: Option<MockContext>,
}

impl<'r, D, F, B> WrappedTest<'r, D, F, B>
where
    D: DoubleFactory,
    F: MockFixture,
    B: FnOnce(&mut F, &MockContext) -> Result<(), BodyError>,
{
    /// Run against `context` instead of the rule's own.
    ///
    /// Use this when the fixture already holds doubles created from `context`, so that their
    /// calls and stubs are the ones validated. The context is not reset.
    pub fn with_context(mut self, context: MockContext) -> Self {
        self.context = Some(context);
        self
    }

    /// The context doubles of this execution record into, unless the rule's context turns out
    /// to be in use when the execution starts.
    pub fn context(&self) -> &MockContext {
        self.context.as_ref().unwrap_or(&self.rule.context)
    }

    /// Execute the lifecycle.
    ///
    /// ## Returns
    /// - `Ok(())` when injection, the body, validation and the strictness check all pass.
    /// - `RuleError::Reflection` / `RuleError::Injection` when the fixture could not be prepared;
    ///   the body and validator do not run.
    /// - `RuleError::Body` with the body's own error, even if validation also failed.
    /// - `RuleError::InvalidUsage` when only validation failed.
    /// - `RuleError::UnnecessaryStubbing` for unused stubs under [`Strictness::Strict`].
    ///
    /// ## Panics
    /// - Re-raises a panic from the body, after validation has run.
    #[tracing::instrument(skip_all, fields(fixture = self.instance.fixture_name()))]
    pub fn invoke(self) -> Result<(), RuleError> {
        let WrappedTest {
            rule,
            body,
            instance,
            context,
        } = self;

        // Held until the execution ends; `None` when the rule's context is not the one in use.
        let (context, _in_use) = match context {
            Some(context) => (context, None),
            None => match rule.in_use.try_lock() {
                Some(guard) => {
                    rule.context.reset();
                    (rule.context.clone(), Some(guard))
                }
                None => {
                    tracing::debug!("rule context already in use; running with a fresh context");
                    (MockContext::new(), None)
                }
            },
        };
        let mut phase = Phase::Idle;

        let descriptors = match scanner::scan(&*instance) {
            Ok(descriptors) => descriptors,
            Err(err) => {
                phase.advance(Phase::ErrorExit);
                return Err(err.into());
            }
        };
        phase.advance(Phase::Scanned);

        let injector = Injector::new(&rule.factory, &context, &rule.config);
        if let Err(err) = injector.inject(&mut *instance, &descriptors) {
            phase.advance(Phase::ErrorExit);
            return Err(err.into());
        }
        phase.advance(Phase::Injected);

        phase.advance(Phase::Running);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut *instance, &context))) {
            Ok(Ok(())) => BodyOutcome::Passed,
            Ok(Err(err)) => BodyOutcome::Failed(err),
            Err(payload) => BodyOutcome::Panicked(payload),
        };

        let validation = context.validate();
        phase.advance(Phase::Validated);

        let result = validator::settle(outcome, validation).and_then(|()| check_stubs(&context, rule.config.strictness));
        phase.advance(if result.is_ok() { Phase::Done } else { Phase::ErrorExit });
        result
    }
}

fn check_stubs(context: &MockContext, strictness: Strictness) -> Result<(), RuleError> {
    if strictness == Strictness::Lenient {
        return Ok(());
    }
    let stubs = context.unused_stubs();
    if stubs.is_empty() {
        return Ok(());
    }
    match strictness {
        Strictness::Strict => Err(RuleError::UnnecessaryStubbing { stubs }),
        _ => {
            for stub in &stubs {
                tracing::warn!(stub = %stub, "unused stub");
            }
            Ok(())
        }
    }
}
