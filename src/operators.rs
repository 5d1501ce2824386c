//! Operator registry
//!
//! An operator is identified by `(token, input_types)`. The same token
//! may have multiple definitions with different operand type tuples —
//! lookup prefers an exact tuple match over a wildcard (`*`) match.

use crate::error::{ErrorContext, OperatorConflictError};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Infix,
    Postfix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Operand type element in an operator's signature. `*` (wildcard)
/// matches any operand type during lookup; an exact type name matches
/// only that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandType {
    Exact(String),
    Wildcard,
}

impl OperandType {
    fn matches(&self, type_name: &str) -> bool {
        match self {
            OperandType::Exact(t) => t == type_name,
            OperandType::Wildcard => true,
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, OperandType::Wildcard)
    }
}

pub type OperatorFn = Arc<dyn Fn(&[crate::value::Value]) -> crate::value::Value + Send + Sync>;

#[derive(Clone)]
pub struct OperatorDef {
    pub token: String,
    pub fixity: Fixity,
    pub binding_power: u32,
    pub associativity: Associativity,
    pub input_types: Vec<OperandType>,
    pub return_type: String,
    pub func: OperatorFn,
}

impl OperatorDef {
    fn is_exact(&self) -> bool {
        self.input_types.iter().all(|t| !t.is_wildcard())
    }

    fn matches(&self, operand_types: &[&str]) -> bool {
        self.input_types.len() == operand_types.len()
            && self
                .input_types
                .iter()
                .zip(operand_types)
                .all(|(def_t, actual)| def_t.matches(actual))
    }
}

#[derive(Default)]
pub struct OperatorRegistry {
    by_token: HashMap<String, Vec<OperatorDef>>,
    frozen: bool,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects a duplicate `(token, input_types)` exact-tuple
    /// registration, and rejects a binding power/fixity that disagrees
    /// with definitions already registered for the same token (spec.md
    /// §4.5: "all definitions for a given token share the same binding
    /// power and fixity").
    pub fn register(&mut self, def: OperatorDef) -> Result<(), OperatorConflictError> {
        if self.frozen {
            return Err(OperatorConflictError {
                message: "operator registry is frozen".to_string(),
                context: ErrorContext::new().field(&def.token),
            });
        }
        if let Some(existing) = self.by_token.get(&def.token) {
            if let Some(first) = existing.first() {
                if first.binding_power != def.binding_power || first.fixity != def.fixity {
                    return Err(OperatorConflictError {
                        message: format!(
                            "operator '{}' already registered with binding power {} / fixity {:?}",
                            def.token, first.binding_power, first.fixity
                        ),
                        context: ErrorContext::new().field(&def.token),
                    });
                }
            }
            if existing
                .iter()
                .any(|d| d.is_exact() && d.input_types == def.input_types)
            {
                return Err(OperatorConflictError {
                    message: format!(
                        "operator '{}' already registered for input types {:?}",
                        def.token, def.input_types
                    ),
                    context: ErrorContext::new().field(&def.token),
                });
            }
        }
        self.by_token.entry(def.token.clone()).or_default().push(def);
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Best-matching definition for `token` against `operand_types`:
    /// exact tuple match first, then a wildcard tuple of matching
    /// arity.
    pub fn lookup_by_types(&self, token: &str, operand_types: &[&str]) -> Option<&OperatorDef> {
        self.lookup_exact(token, operand_types)
            .or_else(|| self.lookup_wildcard(token, operand_types))
    }

    /// Only the exact-tuple match, if any — used by the rule parser to
    /// distinguish "resolved exactly" from "fell back to wildcard" so it
    /// can mark the node's type `Any` in the latter case.
    pub fn lookup_exact(&self, token: &str, operand_types: &[&str]) -> Option<&OperatorDef> {
        let defs = self.by_token.get(token)?;
        defs.iter().filter(|d| d.is_exact()).find(|d| d.matches(operand_types))
    }

    /// Only the wildcard-tuple match, if any.
    pub fn lookup_wildcard(&self, token: &str, operand_types: &[&str]) -> Option<&OperatorDef> {
        let defs = self.by_token.get(token)?;
        defs.iter().filter(|d| !d.is_exact()).find(|d| d.matches(operand_types))
    }

    /// The lone left binding power registered for `token`, or `None` if
    /// the token has no operator definitions at all.
    pub fn get_binding_power(&self, token: &str) -> Option<u32> {
        self.by_token.get(token)?.first().map(|d| d.binding_power)
    }

    pub fn get_fixity(&self, token: &str) -> Option<Fixity> {
        self.by_token.get(token)?.first().map(|d| d.fixity)
    }

    pub fn get_associativity(&self, token: &str) -> Option<Associativity> {
        self.by_token.get(token)?.first().map(|d| d.associativity)
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.by_token.contains_key(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.by_token.keys().map(|s| s.as_str())
    }
}

/// Named presets for building a registry without hand-listing every
/// operator. `standard` resolves the `contains`-vs-`in` Open Question
/// from spec.md §9 by including both; `minimal` includes only the
/// irreducible minimum spec.md §4.5 requires regardless of preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Standard,
    Minimal,
}

impl Preset {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Preset::Standard),
            "minimal" => Some(Preset::Minimal),
            _ => None,
        }
    }
}

/// Builds a registry from a preset, registering built-in operator
/// definitions via `crate::compiler::builtin_ops` (kept there since the
/// implementing functions belong next to the evaluator types they
/// produce).
pub fn build_from_preset(preset: Preset) -> Result<OperatorRegistry, OperatorConflictError> {
    let mut registry = OperatorRegistry::new();
    for def in crate::compiler::builtin_operator_defs(preset) {
        registry.register(def)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn noop_fn() -> OperatorFn {
        Arc::new(|_args| Value::Bool(true))
    }

    #[test]
    fn register_rejects_exact_duplicate() {
        let mut reg = OperatorRegistry::new();
        let def = OperatorDef {
            token: "=".to_string(),
            fixity: Fixity::Infix,
            binding_power: 40,
            associativity: Associativity::Left,
            input_types: vec![OperandType::Exact("Int".into()), OperandType::Exact("Int".into())],
            return_type: "Bool".into(),
            func: noop_fn(),
        };
        assert!(reg.register(def.clone()).is_ok());
        assert!(reg.register(def).is_err());
    }

    #[test]
    fn register_allows_distinct_type_tuples_for_same_token() {
        let mut reg = OperatorRegistry::new();
        let int_def = OperatorDef {
            token: "=".to_string(),
            fixity: Fixity::Infix,
            binding_power: 40,
            associativity: Associativity::Left,
            input_types: vec![OperandType::Exact("Int".into()), OperandType::Exact("Int".into())],
            return_type: "Bool".into(),
            func: noop_fn(),
        };
        let str_def = OperatorDef {
            input_types: vec![OperandType::Exact("Str".into()), OperandType::Exact("Str".into())],
            ..int_def.clone()
        };
        assert!(reg.register(int_def).is_ok());
        assert!(reg.register(str_def).is_ok());
    }

    #[test]
    fn register_rejects_inconsistent_binding_power() {
        let mut reg = OperatorRegistry::new();
        let a = OperatorDef {
            token: "=".to_string(),
            fixity: Fixity::Infix,
            binding_power: 40,
            associativity: Associativity::Left,
            input_types: vec![OperandType::Exact("Int".into()), OperandType::Exact("Int".into())],
            return_type: "Bool".into(),
            func: noop_fn(),
        };
        let b = OperatorDef {
            binding_power: 50,
            input_types: vec![OperandType::Exact("Str".into()), OperandType::Exact("Str".into())],
            ..a.clone()
        };
        assert!(reg.register(a).is_ok());
        assert!(reg.register(b).is_err());
    }

    #[test]
    fn lookup_prefers_exact_over_wildcard() {
        let mut reg = OperatorRegistry::new();
        let wildcard = OperatorDef {
            token: "=".to_string(),
            fixity: Fixity::Infix,
            binding_power: 40,
            associativity: Associativity::Left,
            input_types: vec![OperandType::Wildcard, OperandType::Wildcard],
            return_type: "Bool".into(),
            func: Arc::new(|_| Value::Bool(false)),
        };
        let exact = OperatorDef {
            input_types: vec![OperandType::Exact("Int".into()), OperandType::Exact("Int".into())],
            func: Arc::new(|_| Value::Bool(true)),
            ..wildcard.clone()
        };
        reg.register(wildcard).unwrap();
        reg.register(exact).unwrap();
        let found = reg.lookup_by_types("=", &["Int", "Int"]).unwrap();
        assert_eq!((found.func)(&[]), Value::Bool(true));
        let fallback = reg.lookup_by_types("=", &["Str", "Str"]).unwrap();
        assert_eq!((fallback.func)(&[]), Value::Bool(false));
    }

    #[test]
    fn standard_preset_includes_and_or_not_contains_and_in() {
        let reg = build_from_preset(Preset::Standard).unwrap();
        for token in ["and", "or", "not", "in", "not in", "contains"] {
            assert!(reg.has_token(token), "missing '{token}'");
        }
    }

    #[test]
    fn minimal_preset_excludes_contains_and_comparisons() {
        let reg = build_from_preset(Preset::Minimal).unwrap();
        assert!(reg.has_token("and"));
        assert!(reg.has_token("or"));
        assert!(reg.has_token("not"));
        assert!(!reg.has_token("contains"));
        assert!(!reg.has_token("="));
    }

    #[test]
    fn register_rejects_after_freeze() {
        let mut reg = OperatorRegistry::new();
        reg.freeze();
        let def = OperatorDef {
            token: "=".to_string(),
            fixity: Fixity::Infix,
            binding_power: 40,
            associativity: Associativity::Left,
            input_types: vec![OperandType::Wildcard, OperandType::Wildcard],
            return_type: "Bool".into(),
            func: noop_fn(),
        };
        assert!(reg.register(def).is_err());
    }
}
