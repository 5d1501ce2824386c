//! Error taxonomy
//!
//! Every error kind in the engine shares the same structured payload:
//! a human-readable message plus optional `field`, `expected`, and `got`
//! strings that callers can use to build their own diagnostics without
//! re-parsing the message text.

use thiserror::Error;

/// Structured context attached to every engine error.
///
/// `expected`/`got` are free-form strings rather than an enum because the
/// possible expectations span types, token kinds, arities, and schema
/// names — there is no single closed vocabulary to model as a type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub field: Option<String>,
    pub expected: Option<String>,
    pub got: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }
}

/// Schema text failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("schema parse error at line {line}: {message}")]
pub struct SchemaParseError {
    pub message: String,
    pub line: usize,
    pub context: ErrorContext,
}

/// A validated schema AST is self-inconsistent (duplicates, unknown
/// types, cyclic struct references).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("schema validation error: {message}")]
pub struct SchemaValidationError {
    pub message: String,
    pub context: ErrorContext,
}

/// A rule expression failed to parse against the schema and operator
/// registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rule parse error: {message}")]
pub struct RuleParseError {
    pub message: String,
    pub context: ErrorContext,
}

/// The typed compiler detected an operand/return type mismatch in
/// strict rules mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("type mismatch: {message}")]
pub struct TypeMismatchError {
    pub message: String,
    pub context: ErrorContext,
}

/// A decision failed schema/constraint validation in strict decisions
/// mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("decision validation error: {message}")]
pub struct DecisionValidationError {
    pub message: String,
    pub context: ErrorContext,
}

/// Raised by evaluator internals (missing field, missing function).
/// Never escapes the evaluator shell — callers only ever see a falsy
/// rule result, this type exists for the internal `Result` plumbing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rule evaluation error: {message}")]
pub struct RuleEvaluationError {
    pub message: String,
    pub context: ErrorContext,
}

/// Two operator definitions were registered for the same `(token,
/// input_types)` pair.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("operator conflict: {message}")]
pub struct OperatorConflictError {
    pub message: String,
    pub context: ErrorContext,
}

/// A registration method was called after the engine was frozen by a
/// `compile`/`eval` call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("engine already frozen: {message}")]
pub struct EngineAlreadyFrozenError {
    pub message: String,
    pub context: ErrorContext,
}

/// Umbrella error type returned by the fallible parts of the public API.
///
/// Individual stages raise their own concrete error struct internally;
/// this enum is what crosses module boundaries so callers can match on
/// `kind()` without downcasting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    SchemaParse(#[from] SchemaParseError),
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),
    #[error(transparent)]
    RuleParse(#[from] RuleParseError),
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),
    #[error(transparent)]
    DecisionValidation(#[from] DecisionValidationError),
    #[error(transparent)]
    RuleEvaluation(#[from] RuleEvaluationError),
    #[error(transparent)]
    OperatorConflict(#[from] OperatorConflictError),
    #[error(transparent)]
    EngineAlreadyFrozen(#[from] EngineAlreadyFrozenError),
}

impl EngineError {
    /// The message carried by whichever variant this is, without the
    /// "kind:" prefix `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            EngineError::SchemaParse(e) => &e.message,
            EngineError::SchemaValidation(e) => &e.message,
            EngineError::RuleParse(e) => &e.message,
            EngineError::TypeMismatch(e) => &e.message,
            EngineError::DecisionValidation(e) => &e.message,
            EngineError::RuleEvaluation(e) => &e.message,
            EngineError::OperatorConflict(e) => &e.message,
            EngineError::EngineAlreadyFrozen(e) => &e.message,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            EngineError::SchemaParse(e) => &e.context,
            EngineError::SchemaValidation(e) => &e.context,
            EngineError::RuleParse(e) => &e.context,
            EngineError::TypeMismatch(e) => &e.context,
            EngineError::DecisionValidation(e) => &e.context,
            EngineError::RuleEvaluation(e) => &e.context,
            EngineError::OperatorConflict(e) => &e.context,
            EngineError::EngineAlreadyFrozen(e) => &e.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builder_chains() {
        let ctx = ErrorContext::new()
            .field("score")
            .expected("Int")
            .got("Str");
        assert_eq!(ctx.field.as_deref(), Some("score"));
        assert_eq!(ctx.expected.as_deref(), Some("Int"));
        assert_eq!(ctx.got.as_deref(), Some("Str"));
    }

    #[test]
    fn engine_error_message_and_context_passthrough() {
        let err: EngineError = DecisionValidationError {
            message: "missing required field".to_string(),
            context: ErrorContext::new().field("score"),
        }
        .into();
        assert_eq!(err.message(), "missing required field");
        assert_eq!(err.context().field.as_deref(), Some("score"));
    }

    #[test]
    fn schema_parse_error_display_includes_line() {
        let err = SchemaParseError {
            message: "unexpected token".to_string(),
            line: 3,
            context: ErrorContext::new(),
        };
        assert_eq!(err.to_string(), "schema parse error at line 3: unexpected token");
    }
}
