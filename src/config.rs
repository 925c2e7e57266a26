//! Rule configuration
//!
//! Controls how unused stubs are treated and how the injector picks between several doubles of
//! the same type.

/// Rule configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleConfig {
    /// What to do with stubs that never answered a call, once a test has otherwise passed
    pub strictness: Strictness,
    /// How to choose a double when several match an injection target's field
    pub tie_break: TieBreak,
}

/// Treatment of unused stubs after a passing test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Ignore them
    Lenient,
    /// Log them with `tracing::warn!`
    #[default]
    Warn,
    /// Fail the test with `RuleError::UnnecessaryStubbing`
    Strict,
}

/// Selection policy when more than one double matches a field's type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// The mock field named like the target field, else the first in declaration order
    #[default]
    NameThenDeclarationOrder,
    /// Always the first matching mock field in declaration order
    DeclarationOrder,
}

impl RuleConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `RuleConfig::new().with_strictness(Strictness::Strict)`
    pub fn strict() -> Self {
        Self::new().with_strictness(Strictness::Strict)
    }

    /// Set the unused-stub strictness
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Set the tie-break policy
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}
