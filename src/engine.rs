//! Engine façade
//!
//! Wires the schema, type, and operator registries plus a function map
//! into a single entry point, and enforces freeze-before-use: the first
//! `compile`/`eval` call freezes the engine, after which every
//! registration method raises `EngineAlreadyFrozenError`.

use crate::compiler::{self, FunctionMap, RulesMode};
use crate::decision::DecisionsMode;
use crate::error::{
    EngineAlreadyFrozenError, EngineError, ErrorContext, RuleParseError, SchemaParseError,
};
use crate::evaluator::{CompiledRule, CompiledRuleSet};
use crate::matcher::{MatchConfig, MatchResult, RuleMetadata};
use crate::operators::{OperatorDef, OperatorRegistry, Preset};
use crate::rule::RuleParser;
use crate::schema::{self, Primitive, SchemaRegistry};
use crate::types::{TypeRegistry, Validator};
use crate::value::ValueMap;
use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;

/// One rule as submitted to `compile`/`eval`/`update_rules`: an external
/// id, the rule text, and any caller-supplied metadata keys (e.g.
/// `ordering` for `first` mode).
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub id: String,
    pub rule: String,
    pub metadata: std::collections::BTreeMap<String, crate::value::Value>,
}

impl RuleSpec {
    pub fn new(id: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rule: rule.into(),
            metadata: Default::default(),
        }
    }
}

/// Resolves `load_schema`'s `source` argument: a filesystem path if one
/// exists at that location, otherwise the argument is treated as
/// literal schema text (spec.md §1 keeps this a thin collaborator — no
/// format sniffing, no search path, no remote fetch).
pub fn resolve_source(text_or_path: &str) -> Result<String, EngineError> {
    if Path::new(text_or_path).is_file() {
        std::fs::read_to_string(text_or_path).map_err(|e| {
            EngineError::SchemaParse(SchemaParseError {
                message: format!("failed to read schema file '{text_or_path}': {e}"),
                line: 0,
                context: ErrorContext::new().field(text_or_path),
            })
        })
    } else {
        Ok(text_or_path.to_string())
    }
}

/// Options accepted by `load_schema` (spec.md §4.10/§6.3).
pub struct EngineOptions {
    pub functions: FunctionMap,
    pub rules_mode: RulesMode,
    pub decisions_mode: DecisionsMode,
    pub operators: Preset,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            functions: FunctionMap::new(),
            rules_mode: RulesMode::Strict,
            decisions_mode: DecisionsMode::Loose,
            operators: Preset::Standard,
        }
    }
}

pub struct Engine {
    schema: SchemaRegistry,
    types: TypeRegistry,
    operators: OperatorRegistry,
    functions: FunctionMap,
    rules_mode: RulesMode,
    decisions_mode: DecisionsMode,
    /// Set by the first `compile`/`eval` call. Interior mutability lets
    /// `compile`/`eval` take `&self` — required so multiple
    /// `CompiledRuleSet`s can coexist, each borrowing the engine's
    /// registries (spec.md §3: "multiple compiled sets may coexist per
    /// engine").
    frozen: Cell<bool>,
}

impl Engine {
    /// Parses and validates `source` (file path or inline text),
    /// builds the type and operator registries, and returns a
    /// not-yet-frozen engine ready for further registration.
    pub fn load_schema(source: &str, options: EngineOptions) -> Result<Engine, EngineError> {
        let text = resolve_source(source)?;
        let mut types = TypeRegistry::new();
        let operators = crate::operators::build_from_preset(options.operators)?;

        let known_custom_types: HashSet<String> = types.custom_type_names().into_iter().collect();
        let schema = schema::build_registry(&text, &known_custom_types)?;
        types.set_known_struct_names(schema.ast().structs.iter().map(|s| s.name.clone()).collect());

        Ok(Engine {
            schema,
            types,
            operators,
            functions: options.functions,
            rules_mode: options.rules_mode,
            decisions_mode: options.decisions_mode,
            frozen: Cell::new(false),
        })
    }

    fn check_not_frozen(&self) -> Result<(), EngineAlreadyFrozenError> {
        if self.frozen.get() {
            return Err(EngineAlreadyFrozenError {
                message: "engine is frozen; registration is no longer permitted".to_string(),
                context: ErrorContext::new(),
            });
        }
        Ok(())
    }

    pub fn add_function(
        &mut self,
        name: &str,
        f: crate::compiler::UserFunction,
    ) -> Result<(), EngineError> {
        self.check_not_frozen()?;
        self.functions.insert(name.to_string(), f);
        Ok(())
    }

    pub fn register_type(
        &mut self,
        name: &str,
        base: Primitive,
        validator: Validator,
    ) -> Result<(), EngineError> {
        self.check_not_frozen()?;
        self.types.register_type(name, base, validator)?;
        Ok(())
    }

    pub fn register_operator(&mut self, def: OperatorDef) -> Result<(), EngineError> {
        self.check_not_frozen()?;
        self.operators.register(def)?;
        Ok(())
    }

    /// Compiles `rules` into a `CompiledRuleSet`, freezing the engine on
    /// first call (spec.md §4.10).
    pub fn compile(
        &self,
        rules: &[RuleSpec],
        match_config: Option<MatchConfig>,
    ) -> Result<CompiledRuleSet<'_>, EngineError> {
        self.frozen.set(true);

        let mut seen_ids = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());
        for spec in rules {
            if !seen_ids.insert(spec.id.clone()) {
                return Err(EngineError::RuleParse(RuleParseError {
                    message: format!("duplicate rule id '{}'", spec.id),
                    context: ErrorContext::new().field(&spec.id),
                }));
            }
            let ast = RuleParser::parse(&spec.rule, &self.schema, &self.operators)?;
            let mut warnings = Vec::new();
            let node = compiler::compile(&ast, self.rules_mode, &mut warnings)?;
            compiled.push(CompiledRule {
                id: spec.id.clone(),
                node,
                metadata: RuleMetadata(spec.metadata.clone()),
            });
        }

        Ok(CompiledRuleSet {
            rules: compiled,
            config: match_config.unwrap_or_default(),
            schema: &self.schema,
            types: &self.types,
            functions: &self.functions,
            decisions_mode: self.decisions_mode,
        })
    }

    /// Equivalent to `compile(rules, match).eval_single(decision)`.
    pub fn eval(
        &self,
        rules: &[RuleSpec],
        decision: &ValueMap,
        match_config: Option<MatchConfig>,
    ) -> Result<MatchResult, EngineError> {
        let set = self.compile(rules, match_config)?;
        Ok(set.eval_single(decision)?)
    }

    /// Atomically replaces the caller's rule set: registries are left
    /// untouched (they were already frozen by the first `compile`/`eval`
    /// anyway), and the caller simply swaps in the returned handle.
    pub fn update_rules(
        &self,
        rules: &[RuleSpec],
        match_config: Option<MatchConfig>,
    ) -> Result<CompiledRuleSet<'_>, EngineError> {
        self.compile(rules, match_config)
    }

    pub fn export_schema(&self) -> String {
        self.schema.export_schema()
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }
}
