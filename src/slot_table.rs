//! A fixture assembled at runtime instead of derived.
//!
//! Useful when the set of fields is data-driven (generated test cases, property tests), or to
//! keep a fixture's declaration next to the test body.

use std::borrow::Cow;
use std::fmt;

use crate::reflect::{FieldDescriptor, InjectSlot, Injectable, MockFixture, Slot};

enum Entry {
    Mock(Box<dyn Slot>),
    Inject(Box<dyn InjectSlot>),
    Ordinary(Cow<'static, str>),
}

/// Fixture whose fields are registered one call at a time, in declaration order.
///
/// ```rust
/// use mockrule::{DoubleRegistry, MockContext, RuleConfig, SlotTable, init_mocks};
///
/// let mut table = SlotTable::new("Counters").mock::<u32>("hits").ordinary("label", "String");
/// let registry = DoubleRegistry::new().with(|_| 7_u32);
///
/// init_mocks(&mut table, &registry, &MockContext::new(), &RuleConfig::default()).unwrap();
/// assert_eq!(table.double::<u32>("hits"), Some(7));
/// ```
pub struct SlotTable {
    name: &'static str,
    entries: Vec<(Cow<'static, str>, Entry)>,
}

impl SlotTable {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    /// Declare an empty mock-target field holding a `T`.
    pub fn mock<T: Clone + 'static>(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.push(name, Entry::Mock(Box::new(None::<T>)))
    }

    /// Declare a mock-target field that already holds `value`.
    pub fn mock_with<T: Clone + 'static>(self, name: impl Into<Cow<'static, str>>, value: T) -> Self {
        self.push(name, Entry::Mock(Box::new(Some(value))))
    }

    /// Declare an empty inject-target field of type `S`.
    pub fn inject<S: Injectable + 'static>(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.push(name, Entry::Inject(Box::new(None::<S>)))
    }

    /// Declare an inject-target field that already holds `target`.
    pub fn inject_with<S: Injectable + 'static>(self, name: impl Into<Cow<'static, str>>, target: S) -> Self {
        self.push(name, Entry::Inject(Box::new(Some(target))))
    }

    /// Declare a field the rule never touches.
    pub fn ordinary(self, name: impl Into<Cow<'static, str>>, type_name: impl Into<Cow<'static, str>>) -> Self {
        self.push(name, Entry::Ordinary(type_name.into()))
    }

    fn push(mut self, name: impl Into<Cow<'static, str>>, entry: Entry) -> Self {
        self.entries.push((name.into(), entry));
        self
    }

    /// The current value of mock-target field `name`, if it holds a `T`.
    pub fn double<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.slot(name)?.current()?.downcast::<T>()
    }

    /// The inject target in field `name`, if it holds an `S`.
    pub fn target<S: 'static>(&self, name: &str) -> Option<&S> {
        self.inject_slot(name)?.as_any().downcast_ref::<Option<S>>()?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|(field, _)| field == name).map(|(_, entry)| entry)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, entry)| entry)
    }
}

impl MockFixture for SlotTable {
    fn fixture_name(&self) -> &'static str {
        self.name
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.entries
            .iter()
            .map(|(name, entry)| match entry {
                Entry::Mock(slot) => FieldDescriptor::mock(name.clone(), slot.as_ref()),
                Entry::Inject(slot) => FieldDescriptor::inject(name.clone(), slot.as_ref()),
                Entry::Ordinary(type_name) => FieldDescriptor::ordinary(name.clone(), type_name.clone()),
            })
            .collect()
    }

    fn slot(&self, name: &str) -> Option<&dyn Slot> {
        match self.entry(name)? {
            Entry::Mock(slot) => Some(slot.as_ref()),
            _ => None,
        }
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut dyn Slot> {
        match self.entry_mut(name)? {
            Entry::Mock(slot) => {
                let slot: &mut dyn Slot = slot.as_mut();
                Some(slot)
            }
            _ => None,
        }
    }

    fn inject_slot(&self, name: &str) -> Option<&dyn InjectSlot> {
        match self.entry(name)? {
            Entry::Inject(slot) => Some(slot.as_ref()),
            _ => None,
        }
    }

    fn inject_slot_mut(&mut self, name: &str) -> Option<&mut dyn InjectSlot> {
        match self.entry_mut(name)? {
            Entry::Inject(slot) => {
                let slot: &mut dyn InjectSlot = slot.as_mut();
                Some(slot)
            }
            _ => None,
        }
    }
}

impl fmt::Debug for SlotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = f.debug_map();
        for descriptor in self.fields() {
            fields.entry(&descriptor.name(), &format_args!("{} {}", descriptor.role(), descriptor.type_name()));
        }
        fields.finish()
    }
}
