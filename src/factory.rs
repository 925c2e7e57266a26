//! Double factories: how the injector obtains a double for a mock-target field.
//!
//! [`DoubleFactory`] is the seam the rule is generic over. [`DoubleRegistry`] is the stock
//! implementation: a map from the field's declared type to a closure that wraps a fresh
//! [`DoubleCore`] into a double of that type.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use mockrule_core::{DoubleCore, MockContext};

use crate::errors::UnsupportedTypeError;
use crate::reflect::{Double, TypeDescriptor};

/// What the injector asks a factory for.
#[derive(Debug, Clone, Copy)]
pub struct DoubleRequest<'a> {
    /// Fixture declaring the field.
    pub fixture: &'static str,
    /// Name of the mock-target field; registries use it as the double's name.
    pub field: &'a str,
    /// Declared type of the field's value (the `T` of `Option<T>`).
    pub ty: TypeDescriptor,
}

/// Creates doubles of a requested type.
pub trait DoubleFactory {
    /// Create a double of `request.ty` recording into `context`.
    ///
    /// ## Returns
    /// - A [`Double`] holding a value of exactly `request.ty`.
    /// - `Err(UnsupportedTypeError)` if the factory cannot produce that type.
    fn create(&self, request: &DoubleRequest<'_>, context: &MockContext) -> Result<Double, UnsupportedTypeError>;
}

impl<F: DoubleFactory + ?Sized> DoubleFactory for &F {
    fn create(&self, request: &DoubleRequest<'_>, context: &MockContext) -> Result<Double, UnsupportedTypeError> {
        (**self).create(request, context)
    }
}

impl<F: DoubleFactory + ?Sized> DoubleFactory for Box<F> {
    fn create(&self, request: &DoubleRequest<'_>, context: &MockContext) -> Result<Double, UnsupportedTypeError> {
        (**self).create(request, context)
    }
}

type FactoryFn = Box<dyn Fn(DoubleCore) -> Double>;

/// Type-keyed table of double constructors.
///
/// ```rust
/// use std::sync::Arc;
/// use mockrule::{DoubleCore, DoubleRegistry};
///
/// trait Clock {
///     fn now(&self) -> u64;
/// }
///
/// struct ClockDouble(DoubleCore);
///
/// impl Clock for ClockDouble {
///     fn now(&self) -> u64 {
///         self.0.invoke("now", ())
///     }
/// }
///
/// let registry = DoubleRegistry::new()
///     .with(|core| Arc::new(ClockDouble(core)) as Arc<dyn Clock>);
/// assert!(registry.is_registered::<Arc<dyn Clock>>());
/// ```
#[derive(Default)]
pub struct DoubleRegistry {
    factories: HashMap<TypeId, (TypeDescriptor, FactoryFn)>,
}

impl DoubleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for fields holding a `T`. A later registration for the same type
    /// replaces the earlier one.
    pub fn register<T: Clone + 'static>(&mut self, factory: impl Fn(DoubleCore) -> T + 'static) -> &mut Self {
        let ty = TypeDescriptor::of::<T>();
        let factory: FactoryFn = Box::new(move |core| Double::new(factory(core)));
        if self.factories.insert(ty.id(), (ty, factory)).is_some() {
            tracing::debug!(ty = ty.name(), "double factory replaced");
        }
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: Clone + 'static>(mut self, factory: impl Fn(DoubleCore) -> T + 'static) -> Self {
        self.register(factory);
        self
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl DoubleFactory for DoubleRegistry {
    fn create(&self, request: &DoubleRequest<'_>, context: &MockContext) -> Result<Double, UnsupportedTypeError> {
        let (_, factory) = self.factories.get(&request.ty.id()).ok_or(UnsupportedTypeError {
            type_name: request.ty.name(),
        })?;
        let double = factory(context.new_double(request.field));
        tracing::debug!(fixture = request.fixture, field = request.field, ty = request.ty.name(), "double created");
        Ok(double)
    }
}

impl fmt::Debug for DoubleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.factories.values().map(|(ty, _)| ty.name()).collect();
        types.sort_unstable();
        f.debug_struct("DoubleRegistry").field("types", &types).finish()
    }
}
