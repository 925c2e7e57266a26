//! The recording core embedded in every hand-written double.
//!
//! A double is an ordinary struct implementing the trait under test; each method forwards to
//! [`DoubleCore::invoke`], which records the call and answers it from the stub table:
//!
//! ```rust
//! use mockrule_core::{DoubleCore, MockContext};
//!
//! trait Clock {
//!     fn now(&self) -> u64;
//! }
//!
//! struct ClockDouble(DoubleCore);
//!
//! impl Clock for ClockDouble {
//!     fn now(&self) -> u64 {
//!         self.0.invoke("now", ())
//!     }
//! }
//!
//! let ctx = MockContext::new();
//! let clock = ClockDouble(ctx.new_double("clock"));
//! ctx.when(clock.now()).unwrap().then_return(42_u64);
//! assert_eq!(clock.now(), 42);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::context::{Answer, DoubleId, Invocation, MockContext};

/// Identity, name and engine handle of one double.
#[derive(Clone)]
pub struct DoubleCore {
    id: DoubleId,
    name: Arc<str>,
    context: MockContext,
}

impl DoubleCore {
    pub(crate) fn new(id: DoubleId, name: Arc<str>, context: MockContext) -> Self {
        Self { id, name, context }
    }

    pub fn id(&self) -> DoubleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context this double records into.
    pub fn context(&self) -> &MockContext {
        &self.context
    }

    /// Record a call to `method` with `args` and produce its answer.
    ///
    /// ## Parameters
    /// - `method`: the method name as written in the trait.
    /// - `args`: the call's arguments; pass `()` for none and a tuple for several.
    ///
    /// ## Returns
    /// - (`R`): the stubbed value if a stub matches this call, `R::default()` otherwise.
    ///
    /// ## Panics
    /// - When the matching stub was registered with `then_panic`.
    pub fn invoke<R>(&self, method: &'static str, args: impl fmt::Debug) -> R
    where
        R: Clone + Default + 'static,
    {
        let invocation = Invocation {
            double: self.id,
            double_name: Arc::clone(&self.name),
            method,
            args: render_args(&args),
        };

        // The engine lock is released before any stubbed panic unwinds.
        match self.context.record(invocation) {
            Some(Answer::Return(value)) => match value.downcast_ref::<R>() {
                Some(value) => value.clone(),
                None => {
                    tracing::warn!(
                        double = %self.name,
                        method,
                        expected = std::any::type_name::<R>(),
                        "stubbed value has a different type than the call returns; using default"
                    );
                    R::default()
                }
            },
            Some(Answer::Panic(message)) => panic!("{message}"),
            None => R::default(),
        }
    }
}

impl fmt::Debug for DoubleCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

fn render_args(args: &impl fmt::Debug) -> String {
    let rendered = format!("{args:?}");
    if rendered == "()" { String::new() } else { rendered }
}
