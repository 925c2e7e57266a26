//! Injection: fill mock-target fields with doubles and wire them into inject targets.
//!
//! The pass runs in two steps over one scan of the fixture:
//! 1. every empty mock-target field gets a double from the [`DoubleFactory`];
//! 2. every inject-target field is constructed if empty, scanned one level deep, and each of its
//!    slot-backed fields whose type matches a double receives that double.
//!
//! Present values are never replaced, so running the pass twice is the same as running it once.

use mockrule_core::MockContext;

use crate::config::{RuleConfig, TieBreak};
use crate::errors::{InjectionError, RuleError};
use crate::factory::{DoubleFactory, DoubleRequest};
use crate::reflect::{Double, FieldDescriptor, FieldRole, MockFixture, TypeDescriptor};
use crate::scanner;

/// One double assigned into an inject target's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiring {
    /// The inject-target field on the fixture.
    pub target: String,
    /// The field of the target that received the double.
    pub field: String,
    /// The mock-target field the double came from.
    pub mock: String,
}

/// What an injection pass did, by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    /// Mock-target fields that received a new double.
    pub created: Vec<String>,
    /// Mock-target fields that already held a value.
    pub reused: Vec<String>,
    /// Inject-target fields that were constructed.
    pub constructed: Vec<String>,
    pub wired: Vec<Wiring>,
}

/// A double available for wiring, tagged with the mock field it lives in.
struct Candidate<'d> {
    mock: &'d str,
    double: Double,
}

pub struct Injector<'a> {
    factory: &'a dyn DoubleFactory,
    context: &'a MockContext,
    tie_break: TieBreak,
}

impl<'a> Injector<'a> {
    pub fn new(factory: &'a dyn DoubleFactory, context: &'a MockContext, config: &RuleConfig) -> Self {
        Self {
            factory,
            context,
            tie_break: config.tie_break,
        }
    }

    /// Populate `instance` using the descriptors from a scan of it.
    ///
    /// ## Returns
    /// - An [`InjectionReport`] on success.
    /// - The first [`InjectionError`] encountered; fields handled before it keep their values.
    #[tracing::instrument(skip_all, fields(fixture = instance.fixture_name()))]
    pub fn inject(
        &self,
        instance: &mut dyn MockFixture,
        descriptors: &[FieldDescriptor],
    ) -> Result<InjectionReport, InjectionError> {
        let mut report = InjectionReport::default();
        let candidates = self.fill_mocks(instance, descriptors, &mut report)?;

        let fixture = instance.fixture_name();
        for descriptor in descriptors.iter().filter(|d| d.role() == FieldRole::InjectTarget) {
            let field = descriptor.name();
            let slot = instance
                .inject_slot_mut(field)
                .ok_or_else(|| InjectionError::MissingAccessor {
                    fixture,
                    field: field.to_string(),
                })?;

            let constructed = !slot.is_present();
            let target = slot.get_or_construct().map_err(|source| InjectionError::Construction {
                fixture,
                field: field.to_string(),
                source,
            })?;
            if constructed {
                tracing::debug!(field, "inject target constructed");
                report.constructed.push(field.to_string());
            }

            self.wire(fixture, field, target, &candidates, &mut report)?;
        }

        tracing::debug!(
            created = report.created.len(),
            reused = report.reused.len(),
            wired = report.wired.len(),
            "injection finished"
        );
        Ok(report)
    }

    /// Step 1: make sure every mock-target field holds a double.
    fn fill_mocks<'d>(
        &self,
        instance: &mut dyn MockFixture,
        descriptors: &'d [FieldDescriptor],
        report: &mut InjectionReport,
    ) -> Result<Vec<Candidate<'d>>, InjectionError> {
        let fixture = instance.fixture_name();
        let mut candidates = Vec::new();

        for descriptor in descriptors.iter().filter(|d| d.role() == FieldRole::MockTarget) {
            let field = descriptor.name();
            let slot = instance.slot_mut(field).ok_or_else(|| InjectionError::MissingAccessor {
                fixture,
                field: field.to_string(),
            })?;

            let double = match slot.current() {
                Some(existing) => {
                    report.reused.push(field.to_string());
                    existing
                }
                None => {
                    let request = DoubleRequest {
                        fixture,
                        field,
                        ty: slot.slot_type(),
                    };
                    let double = self.factory.create(&request, self.context).map_err(|source| {
                        InjectionError::UnsupportedType {
                            fixture,
                            field: field.to_string(),
                            source,
                        }
                    })?;
                    slot.assign(&double).map_err(|mismatch| InjectionError::TypeMismatch {
                        fixture,
                        field: field.to_string(),
                        expected: mismatch.expected,
                        found: mismatch.found,
                    })?;
                    report.created.push(field.to_string());
                    double
                }
            };
            candidates.push(Candidate { mock: field, double });
        }

        Ok(candidates)
    }

    /// Step 2: assign matching doubles into the slot-backed fields of one inject target.
    fn wire(
        &self,
        fixture: &'static str,
        target_field: &str,
        target: &mut dyn MockFixture,
        candidates: &[Candidate<'_>],
        report: &mut InjectionReport,
    ) -> Result<(), InjectionError> {
        let target_fields = scanner::scan(&*target).map_err(|source| InjectionError::TargetScan {
            fixture,
            field: target_field.to_string(),
            source,
        })?;
        let target_name = target.fixture_name();

        for field in target_fields.iter().filter(|f| f.accepts_doubles()) {
            let Some(ty) = field.slot_type() else { continue };
            let Some(chosen) = select(self.tie_break, field.name(), ty, candidates) else {
                continue;
            };

            let slot = target
                .slot_mut(field.name())
                .ok_or_else(|| InjectionError::MissingAccessor {
                    fixture: target_name,
                    field: field.name().to_string(),
                })?;
            slot.assign(&chosen.double)
                .map_err(|mismatch| InjectionError::TypeMismatch {
                    fixture: target_name,
                    field: field.name().to_string(),
                    expected: mismatch.expected,
                    found: mismatch.found,
                })?;

            tracing::trace!(inject_target = target_field, field = field.name(), mock = chosen.mock, "double wired");
            report.wired.push(Wiring {
                target: target_field.to_string(),
                field: field.name().to_string(),
                mock: chosen.mock.to_string(),
            });
        }
        Ok(())
    }
}

/// Pick the double for a target field of type `ty` among `candidates` (declaration order).
fn select<'c, 'd>(
    tie_break: TieBreak,
    field: &str,
    ty: TypeDescriptor,
    candidates: &'c [Candidate<'d>],
) -> Option<&'c Candidate<'d>> {
    let mut matching = candidates
        .iter()
        .filter(|candidate| candidate.double.type_descriptor().is_assignable_to(&ty));

    match tie_break {
        TieBreak::DeclarationOrder => matching.next(),
        TieBreak::NameThenDeclarationOrder => {
            let matching: Vec<_> = matching.collect();
            if matching.len() > 1 {
                tracing::debug!(field, candidates = matching.len(), "several doubles match; resolving by name");
            }
            matching
                .iter()
                .find(|candidate| candidate.mock == field)
                .or_else(|| matching.first())
                .copied()
        }
    }
}

/// Scan `instance` and populate its doubles without running a body or validating.
///
/// ## Parameters
/// - `instance`: the fixture to populate.
/// - `factory`: source of new doubles.
/// - `context`: the context new doubles record into.
/// - `config`: only the tie-break policy is used.
///
/// ## Returns
/// - The [`InjectionReport`] of the pass.
/// - `RuleError::Reflection` or `RuleError::Injection` on failure.
pub fn init_mocks(
    instance: &mut dyn MockFixture,
    factory: &dyn DoubleFactory,
    context: &MockContext,
    config: &RuleConfig,
) -> Result<InjectionReport, RuleError> {
    let descriptors = scanner::scan(&*instance)?;
    let report = Injector::new(factory, context, config).inject(instance, &descriptors)?;
    Ok(report)
}
