#![forbid(unsafe_code)]
//! Test-lifecycle rule that creates test doubles, injects them and validates their use.
//!
//! A test declares a fixture: mock-target fields that should receive doubles and inject-target
//! fields holding the object under test. [`MockRule`] wraps the test body so that, for each run,
//!
//! 1. the fixture's fields are scanned ([`scanner::scan`]);
//! 2. every empty mock-target field gets a double and every inject target is constructed and wired
//!    with those doubles ([`injector::Injector`]);
//! 3. the body runs;
//! 4. the double engine is checked for misuse such as an unfinished `when(..)` ([`MockContext::validate`]).
//!
//! The double engine itself (contexts, stubbing, invocation recording) lives in `mockrule_core`
//! and is re-exported here. Fixture field tables come from `#[derive(MockFixture)]`,
//! `#[derive(Injectable)]` or a runtime [`SlotTable`].
//!
//! ## Panic Policy
//!
//! - **Library code**: errors are returned as [`RuleError`] and its component enums. The only panics
//!   are re-raised body panics and `then_panic` stubs, both requested by the test.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

// Generated code names `::mockrule::...`, which must also resolve inside this crate's own tests.
extern crate self as mockrule;

pub mod config;
pub mod errors;
pub mod factory;
pub mod injector;
pub mod logging;
pub mod reflect;
pub mod rule;
pub mod scanner;
pub mod slot_table;
mod validator;

pub use config::{RuleConfig, Strictness, TieBreak};
pub use errors::{BodyError, ConstructionError, InjectionError, ReflectionError, RuleError, UnsupportedTypeError};
pub use factory::{DoubleFactory, DoubleRegistry, DoubleRequest};
pub use injector::{InjectionReport, Injector, Wiring, init_mocks};
pub use reflect::{Double, FieldDescriptor, FieldRole, InjectSlot, Injectable, MockFixture, Slot, SlotMismatch, TypeDescriptor};
pub use rule::{MockRule, WrappedTest};
pub use scanner::scan;
pub use slot_table::SlotTable;

pub use mockrule_core::{DoubleCore, DoubleId, InvalidUsageError, Invocation, MockContext, OngoingStubbing, UnusedStub};
pub use mockrule_derive::{Injectable, MockFixture};
