//! Field scanning: turns a fixture's field table into validated descriptors.

use std::collections::HashSet;

use crate::errors::ReflectionError;
use crate::reflect::{FieldDescriptor, FieldRole, MockFixture};

/// Enumerate the declared fields of `instance` in declaration order.
///
/// ## Parameters
/// - `instance`: the fixture to scan; it is not modified.
///
/// ## Returns
/// - One [`FieldDescriptor`] per declared field, classified by its marker.
/// - `Err(ReflectionError)` if a name repeats or a marked field cannot be reached through the
///   fixture's accessors.
#[tracing::instrument(skip_all, fields(fixture = instance.fixture_name()))]
pub fn scan(instance: &dyn MockFixture) -> Result<Vec<FieldDescriptor>, ReflectionError> {
    let fixture = instance.fixture_name();
    let descriptors = instance.fields();

    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let name = descriptor.name();
        if !seen.insert(name) {
            return Err(ReflectionError::DuplicateField {
                fixture,
                field: name.to_string(),
            });
        }
        if let Some(reason) = inaccessible_reason(instance, descriptor) {
            return Err(ReflectionError::Inaccessible {
                fixture,
                field: name.to_string(),
                role: descriptor.role(),
                reason,
            });
        }
    }

    tracing::debug!(
        fields = descriptors.len(),
        mocks = descriptors.iter().filter(|d| d.role() == FieldRole::MockTarget).count(),
        inject_targets = descriptors.iter().filter(|d| d.role() == FieldRole::InjectTarget).count(),
        "fixture scanned"
    );
    Ok(descriptors)
}

fn inaccessible_reason(instance: &dyn MockFixture, descriptor: &FieldDescriptor) -> Option<&'static str> {
    let name = descriptor.name();
    match descriptor.role() {
        FieldRole::MockTarget if descriptor.slot_type().is_none() => Some("the field has no slot type"),
        FieldRole::MockTarget if instance.slot(name).is_none() => Some("the fixture exposes no slot for it"),
        FieldRole::InjectTarget if instance.inject_slot(name).is_none() => {
            Some("the fixture exposes no inject slot for it")
        }
        FieldRole::Ordinary if descriptor.slot_type().is_some() && instance.slot(name).is_none() => {
            Some("the fixture exposes no slot for it")
        }
        _ => None,
    }
}
