//! Field tables: what a fixture exposes to the scanner and injector.
//!
//! Rust has no runtime reflection, so a fixture describes its own fields through [`MockFixture`],
//! normally generated by `#[derive(MockFixture)]` / `#[derive(Injectable)]` (or built at runtime
//! with [`crate::SlotTable`]). Slot-backed fields are `Option<T>` values reached through the
//! [`Slot`] and [`InjectSlot`] traits.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::errors::ConstructionError;

// ============================================================================
// Types and doubles
// ============================================================================

/// Runtime identity of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a value of this type can be assigned to a slot of type `other`.
    ///
    /// There is no subtyping between Rust types, so compatibility is type identity: a slot
    /// declared `Option<Arc<dyn Payments>>` accepts exactly the `Arc<dyn Payments>` doubles.
    pub fn is_assignable_to(&self, other: &TypeDescriptor) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased value that can be assigned into slots of its type.
///
/// Clones of a `Double` hand out clones of one stored value, so a double held in a `Arc` keeps its
/// identity wherever it is assigned.
#[derive(Clone)]
pub struct Double {
    ty: TypeDescriptor,
    value: Rc<dyn Any>,
}

impl Double {
    pub fn new<T: Clone + 'static>(value: T) -> Self {
        Self {
            ty: TypeDescriptor::of::<T>(),
            value: Rc::new(value),
        }
    }

    pub fn type_descriptor(&self) -> TypeDescriptor {
        self.ty
    }

    /// A clone of the stored value, if it is a `T`.
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for Double {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Double").field(&self.ty.name).finish()
    }
}

// ============================================================================
// Slots
// ============================================================================

/// A double whose type does not match the slot it was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

/// A field that can hold a double.
pub trait Slot {
    /// The type of value the slot holds (the `T` of `Option<T>`).
    fn slot_type(&self) -> TypeDescriptor;

    fn is_present(&self) -> bool;

    /// The current value as a [`Double`], if present.
    fn current(&self) -> Option<Double>;

    fn assign(&mut self, double: &Double) -> Result<(), SlotMismatch>;
}

impl<T: Clone + 'static> Slot for Option<T> {
    fn slot_type(&self) -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn current(&self) -> Option<Double> {
        self.as_ref().map(|value| Double::new(value.clone()))
    }

    fn assign(&mut self, double: &Double) -> Result<(), SlotMismatch> {
        let value = double.downcast::<T>().ok_or(SlotMismatch {
            expected: std::any::type_name::<T>(),
            found: double.type_descriptor().name(),
        })?;
        *self = Some(value);
        Ok(())
    }
}

/// A field holding the object doubles are injected into.
pub trait InjectSlot {
    /// The type of the injection target (the `S` of `Option<S>`).
    fn target_type(&self) -> TypeDescriptor;

    fn is_present(&self) -> bool;

    fn target(&self) -> Option<&dyn MockFixture>;

    /// The target, constructing it first if the field is empty.
    fn get_or_construct(&mut self) -> Result<&mut dyn MockFixture, ConstructionError>;

    /// The field itself (`&Option<S>`), for typed access by callers.
    fn as_any(&self) -> &dyn Any;
}

impl<S: Injectable + 'static> InjectSlot for Option<S> {
    fn target_type(&self) -> TypeDescriptor {
        TypeDescriptor::of::<S>()
    }

    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn target(&self) -> Option<&dyn MockFixture> {
        self.as_ref().map(|target| target as &dyn MockFixture)
    }

    fn get_or_construct(&mut self) -> Result<&mut dyn MockFixture, ConstructionError> {
        let target = match self.take() {
            Some(target) => target,
            None => S::construct()?,
        };
        Ok(self.insert(target))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Field descriptors
// ============================================================================

/// Classification of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Receives an auto-created double.
    MockTarget,
    /// Receives an object wired with the fixture's doubles.
    InjectTarget,
    Ordinary,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::MockTarget => write!(f, "mock target"),
            FieldRole::InjectTarget => write!(f, "inject target"),
            FieldRole::Ordinary => write!(f, "ordinary field"),
        }
    }
}

/// Metadata for one declared field, captured by a scan pass.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: Cow<'static, str>,
    type_name: Cow<'static, str>,
    role: FieldRole,
    slot_type: Option<TypeDescriptor>,
    present: bool,
    current: Option<Double>,
}

impl FieldDescriptor {
    /// A `#[mock]` field.
    pub fn mock(name: impl Into<Cow<'static, str>>, slot: &dyn Slot) -> Self {
        Self::from_slot(name, FieldRole::MockTarget, slot)
    }

    /// A slot-backed field that is not a mock target (an injection candidate).
    pub fn slot(name: impl Into<Cow<'static, str>>, slot: &dyn Slot) -> Self {
        Self::from_slot(name, FieldRole::Ordinary, slot)
    }

    /// An `#[inject_mocks]` field.
    pub fn inject(name: impl Into<Cow<'static, str>>, slot: &dyn InjectSlot) -> Self {
        let target = slot.target_type();
        Self {
            name: name.into(),
            type_name: Cow::Borrowed(target.name()),
            role: FieldRole::InjectTarget,
            slot_type: Some(target),
            present: slot.is_present(),
            current: None,
        }
    }

    /// A field the rule never touches.
    pub fn ordinary(name: impl Into<Cow<'static, str>>, type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            role: FieldRole::Ordinary,
            slot_type: None,
            present: true,
            current: None,
        }
    }

    fn from_slot(name: impl Into<Cow<'static, str>>, role: FieldRole, slot: &dyn Slot) -> Self {
        let slot_type = slot.slot_type();
        Self {
            name: name.into(),
            type_name: Cow::Borrowed(slot_type.name()),
            role,
            slot_type: Some(slot_type),
            present: slot.is_present(),
            current: slot.current(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn role(&self) -> FieldRole {
        self.role
    }

    /// The held type for slot-backed and inject fields; `None` for ordinary fields.
    pub fn slot_type(&self) -> Option<TypeDescriptor> {
        self.slot_type
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// The value at scan time, for slot-backed fields.
    pub fn current(&self) -> Option<&Double> {
        self.current.as_ref()
    }

    /// Whether a double may be wired into this field of an injection target.
    pub fn accepts_doubles(&self) -> bool {
        self.role != FieldRole::InjectTarget && self.slot_type.is_some()
    }
}

// ============================================================================
// Fixture traits
// ============================================================================

/// A type whose fields the rule can scan and fill.
///
/// Usually derived. Hand-written implementations list their fields in declaration order from
/// [`fields`](MockFixture::fields) and expose every slot-backed field through the accessors.
pub trait MockFixture {
    fn fixture_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn fields(&self) -> Vec<FieldDescriptor>;

    fn slot(&self, _name: &str) -> Option<&dyn Slot> {
        None
    }

    fn slot_mut(&mut self, _name: &str) -> Option<&mut dyn Slot> {
        None
    }

    fn inject_slot(&self, _name: &str) -> Option<&dyn InjectSlot> {
        None
    }

    fn inject_slot_mut(&mut self, _name: &str) -> Option<&mut dyn InjectSlot> {
        None
    }
}

/// A type that can sit behind an `#[inject_mocks]` field.
pub trait Injectable: MockFixture + Sized {
    /// Build an instance with no arguments.
    ///
    /// The default reports that the type has no zero-argument construction path.
    fn construct() -> Result<Self, ConstructionError> {
        Err(ConstructionError::no_zero_arg::<Self>())
    }
}
