//! Property-based tests for injection
//!
//! Fixtures are generated as `SlotTable`s with a random mix of empty and pre-populated mock
//! fields of three types, plus one inject target holding a field of each type.

use mockrule::{DoubleCore, DoubleRegistry, Injectable, MockContext, RuleConfig, SlotTable, init_mocks};
use proptest::prelude::*;

#[derive(Default, Injectable)]
struct Sink {
    small: Option<u8>,
    medium: Option<u16>,
    large: Option<u32>,
}

#[derive(Debug, Clone)]
enum FieldSpec {
    Small(Option<u8>),
    Medium(Option<u16>),
    Large(Option<u32>),
}

fn field_spec_strategy() -> impl Strategy<Value = FieldSpec> {
    prop_oneof![
        proptest::option::of(any::<u8>()).prop_map(FieldSpec::Small),
        proptest::option::of(any::<u16>()).prop_map(FieldSpec::Medium),
        proptest::option::of(any::<u32>()).prop_map(FieldSpec::Large),
    ]
}

fn registry() -> DoubleRegistry {
    // Each double's value is its identity, so equal values mean the same double.
    DoubleRegistry::new()
        .with(|core: DoubleCore| core.id().get() as u8)
        .with(|core: DoubleCore| core.id().get() as u16)
        .with(|core: DoubleCore| core.id().get() as u32)
}

fn field_name(index: usize) -> String {
    format!("f{index}")
}

fn build(specs: &[FieldSpec]) -> SlotTable {
    let mut table = SlotTable::new("Generated");
    for (index, spec) in specs.iter().enumerate() {
        let name = field_name(index);
        table = match spec {
            FieldSpec::Small(Some(value)) => table.mock_with(name, *value),
            FieldSpec::Small(None) => table.mock::<u8>(name),
            FieldSpec::Medium(Some(value)) => table.mock_with(name, *value),
            FieldSpec::Medium(None) => table.mock::<u16>(name),
            FieldSpec::Large(Some(value)) => table.mock_with(name, *value),
            FieldSpec::Large(None) => table.mock::<u32>(name),
        };
    }
    table.inject::<Sink>("sink")
}

/// Current value of field `index`, widened.
fn value_of(table: &SlotTable, index: usize, spec: &FieldSpec) -> Option<u64> {
    let name = field_name(index);
    match spec {
        FieldSpec::Small(_) => table.double::<u8>(&name).map(u64::from),
        FieldSpec::Medium(_) => table.double::<u16>(&name).map(u64::from),
        FieldSpec::Large(_) => table.double::<u32>(&name).map(u64::from),
    }
}

fn values(table: &SlotTable, specs: &[FieldSpec]) -> Vec<Option<u64>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| value_of(table, index, spec))
        .collect()
}

/// Value of the first field (declaration order) matching `pick`.
fn first_value(table: &SlotTable, specs: &[FieldSpec], pick: fn(&FieldSpec) -> bool) -> Option<u64> {
    specs
        .iter()
        .enumerate()
        .find(|(_, spec)| pick(spec))
        .and_then(|(index, spec)| value_of(table, index, spec))
}

proptest! {
    /// Property: every mock-target field holds a value after injection
    #[test]
    fn injection_is_complete(specs in proptest::collection::vec(field_spec_strategy(), 0..12)) {
        let mut table = build(&specs);
        init_mocks(&mut table, &registry(), &MockContext::new(), &RuleConfig::default()).expect("injection failed");

        for (index, value) in values(&table, &specs).into_iter().enumerate() {
            prop_assert!(value.is_some(), "field f{} left empty", index);
        }
    }

    /// Property: pre-populated fields keep their values
    #[test]
    fn present_values_are_preserved(specs in proptest::collection::vec(field_spec_strategy(), 0..12)) {
        let mut table = build(&specs);
        init_mocks(&mut table, &registry(), &MockContext::new(), &RuleConfig::default()).expect("injection failed");

        for (index, spec) in specs.iter().enumerate() {
            let before = match spec {
                FieldSpec::Small(value) => value.map(u64::from),
                FieldSpec::Medium(value) => value.map(u64::from),
                FieldSpec::Large(value) => value.map(u64::from),
            };
            if before.is_some() {
                prop_assert_eq!(value_of(&table, index, spec), before);
            }
        }
    }

    /// Property: injecting twice is the same as injecting once
    #[test]
    fn injection_is_idempotent(specs in proptest::collection::vec(field_spec_strategy(), 0..12)) {
        let ctx = MockContext::new();
        let registry = registry();
        let mut table = build(&specs);

        init_mocks(&mut table, &registry, &ctx, &RuleConfig::default()).expect("first pass failed");
        let first = values(&table, &specs);
        let sink_first = table.target::<Sink>("sink").map(|s| (s.small, s.medium, s.large));

        let report = init_mocks(&mut table, &registry, &ctx, &RuleConfig::default()).expect("second pass failed");
        prop_assert!(report.created.is_empty());
        prop_assert!(report.constructed.is_empty());
        prop_assert_eq!(values(&table, &specs), first);
        prop_assert_eq!(table.target::<Sink>("sink").map(|s| (s.small, s.medium, s.large)), sink_first);
    }

    /// Property: without a name match, the target receives the first double of its type
    #[test]
    fn target_fields_receive_first_matching_double(specs in proptest::collection::vec(field_spec_strategy(), 0..12)) {
        let mut table = build(&specs);
        init_mocks(&mut table, &registry(), &MockContext::new(), &RuleConfig::default()).expect("injection failed");
        let sink = table.target::<Sink>("sink").expect("sink constructed");

        prop_assert_eq!(
            sink.small.map(u64::from),
            first_value(&table, &specs, |spec| matches!(spec, FieldSpec::Small(_)))
        );
        prop_assert_eq!(
            sink.medium.map(u64::from),
            first_value(&table, &specs, |spec| matches!(spec, FieldSpec::Medium(_)))
        );
        prop_assert_eq!(
            sink.large.map(u64::from),
            first_value(&table, &specs, |spec| matches!(spec, FieldSpec::Large(_)))
        );
    }
}
