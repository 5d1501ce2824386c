//! Rule evaluator
//!
//! Runs a compiled rule set against one or more decisions: validate,
//! evaluate each rule (demoting any `RuleEvaluationError` to `false`),
//! then hand the raw per-rule values to `matcher::aggregate`.

use crate::compiler::{CompiledNode, FunctionMap};
use crate::decision::{self, DecisionsMode};
use crate::matcher::{self, MatchConfig, MatchResult, RuleMetadata, RuleOutcome};
use crate::schema::SchemaRegistry;
use crate::types::TypeRegistry;
use crate::value::{Value, ValueMap};

/// One compiled rule: its external id, evaluator tree, and metadata.
pub struct CompiledRule {
    pub id: String,
    pub node: CompiledNode,
    pub metadata: RuleMetadata,
}

/// An ordered set of compiled rules bound to a match configuration. A
/// `CompiledRuleSet` borrows the engine's schema/type registries and
/// function map rather than owning copies, per spec.md §3's ownership
/// rules ("borrows, does not mutate").
pub struct CompiledRuleSet<'a> {
    pub rules: Vec<CompiledRule>,
    pub config: MatchConfig,
    pub schema: &'a SchemaRegistry,
    pub types: &'a TypeRegistry,
    pub functions: &'a FunctionMap,
    pub decisions_mode: DecisionsMode,
}

impl<'a> CompiledRuleSet<'a> {
    /// Validates `decision`, evaluates every rule, and aggregates —
    /// spec.md §6.3's `CompiledRuleSet::eval_single`.
    pub fn eval_single(
        &self,
        decision: &ValueMap,
    ) -> Result<MatchResult, crate::error::DecisionValidationError> {
        eval_single(self, decision)
    }

    /// Maps `eval_single` over a batch — spec.md §6.3's
    /// `CompiledRuleSet::eval`.
    pub fn eval(
        &self,
        decisions: &[ValueMap],
    ) -> Result<Vec<MatchResult>, crate::error::DecisionValidationError> {
        eval_batch(self, decisions)
    }
}

/// Validates `decision`, evaluates every rule in declared order (any
/// runtime error is demoted to `false`), and aggregates per the
/// configured match mode. A free function rather than a method on
/// `CompiledRuleSet` because a strict-mode decision validation failure
/// must surface as an error, while everything downstream of a
/// successful validation never fails (spec.md §4.9's evaluator-shell-
/// demotes-to-false guarantee).
pub fn eval_single(
    set: &CompiledRuleSet<'_>,
    decision: &ValueMap,
) -> Result<MatchResult, crate::error::DecisionValidationError> {
    let (cleaned, warnings) =
        decision::validate_decision(set.schema, set.types, set.decisions_mode, decision)?;

    let decision_id = cleaned.get("id").map(|v| v.to_string());

    let values: Vec<Value> = set
        .rules
        .iter()
        .map(|rule| {
            rule.node
                .evaluate(&cleaned, set.functions)
                .unwrap_or(Value::Bool(false))
        })
        .collect();

    let outcomes: Vec<RuleOutcome<'_>> = set
        .rules
        .iter()
        .zip(&values)
        .map(|(rule, value)| RuleOutcome {
            id: &rule.id,
            value,
            metadata: &rule.metadata,
        })
        .collect();

    Ok(matcher::aggregate(
        &set.config,
        &outcomes,
        decision_id,
        warnings,
    ))
}

/// Maps `eval_single` over a batch of decisions.
pub fn eval_batch(
    set: &CompiledRuleSet<'_>,
    decisions: &[ValueMap],
) -> Result<Vec<MatchResult>, crate::error::DecisionValidationError> {
    decisions.iter().map(|d| eval_single(set, d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{self, RulesMode};
    use crate::operators::{self, Preset};
    use crate::rule::RuleParser;
    use crate::schema;
    use std::collections::HashMap;
    use std::collections::HashSet;

    fn build_rule(
        schema: &SchemaRegistry,
        ops: &operators::OperatorRegistry,
        src: &str,
        id: &str,
    ) -> CompiledRule {
        let ast = RuleParser::parse(src, schema, ops).unwrap();
        let mut warnings = Vec::new();
        let node = compiler::compile(&ast, RulesMode::Strict, &mut warnings).unwrap();
        CompiledRule {
            id: id.to_string(),
            node,
            metadata: RuleMetadata::default(),
        }
    }

    #[test]
    fn simple_decline_scenario() {
        let schema = schema::build_registry("credit_score: Int\n", &HashSet::new()).unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rule = build_rule(&schema, &ops, "credit_score < 600", "r");
        let set = CompiledRuleSet {
            rules: vec![rule],
            config: MatchConfig::All,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut decision = ValueMap::new();
        decision.insert("credit_score".to_string(), Value::Int(580));
        let result = eval_single(&set, &decision).unwrap();
        assert_eq!(result.matched, vec!["r".to_string()]);
    }

    #[test]
    fn score_aggregation_scenario() {
        let schema = schema::build_registry(
            "signal_a: Bool\nsignal_b: Bool\nsignal_c: Int\n",
            &HashSet::new(),
        )
        .unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rules = vec![
            build_rule(&schema, &ops, "signal_a = true", "s1"),
            build_rule(&schema, &ops, "signal_b = true", "s2"),
            build_rule(&schema, &ops, "signal_c > 50", "s3"),
        ];
        let set = CompiledRuleSet {
            rules,
            config: MatchConfig::score_default(),
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut decision = ValueMap::new();
        decision.insert("signal_a".to_string(), Value::Bool(true));
        decision.insert("signal_b".to_string(), Value::Bool(false));
        decision.insert("signal_c".to_string(), Value::Int(100));
        let result = eval_single(&set, &decision).unwrap();
        assert_eq!(result.score, Some(2.0));
    }

    #[test]
    fn inverse_eligibility_scenario() {
        let schema = schema::build_registry(
            "state_code: Str\ncredit_score: Int\n",
            &HashSet::new(),
        )
        .unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rules = vec![
            build_rule(
                &schema,
                &ops,
                "state_code not in ['CA', 'NY']",
                "eligible_state",
            ),
            build_rule(&schema, &ops, "credit_score >= 600", "eligible_credit"),
        ];
        let set = CompiledRuleSet {
            rules,
            config: MatchConfig::Inverse,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut decision = ValueMap::new();
        decision.insert("state_code".to_string(), Value::Str("TX".to_string()));
        decision.insert("credit_score".to_string(), Value::Int(500));
        let result = eval_single(&set, &decision).unwrap();
        assert_eq!(result.excluded, vec!["eligible_credit".to_string()]);
    }

    #[test]
    fn struct_dot_notation_scenario() {
        let schema = schema::build_registry(
            "struct Addr { city: Str }\naddr: Addr\n",
            &HashSet::new(),
        )
        .unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rule = build_rule(&schema, &ops, "addr.city = 'SF'", "r");
        let set = CompiledRuleSet {
            rules: vec![rule],
            config: MatchConfig::All,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut city = ValueMap::new();
        city.insert("city".to_string(), Value::Str("SF".to_string()));
        let mut decision = ValueMap::new();
        decision.insert("addr".to_string(), Value::Struct(city));
        let result = eval_single(&set, &decision).unwrap();
        assert!(!result.matched.is_empty());
    }

    #[test]
    fn loose_decisions_mode_never_raises_and_warns() {
        let schema = schema::build_registry("score: Int\n", &HashSet::new()).unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rule = build_rule(&schema, &ops, "score > 0", "r");
        let set = CompiledRuleSet {
            rules: vec![rule],
            config: MatchConfig::All,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Loose,
        };
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Str("bad".to_string()));
        let result = eval_single(&set, &decision).unwrap();
        assert!(result.matched.is_empty());
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn strict_decisions_mode_raises_on_invalid_decision() {
        let schema = schema::build_registry("score: Int\n", &HashSet::new()).unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rule = build_rule(&schema, &ops, "score > 0", "r");
        let set = CompiledRuleSet {
            rules: vec![rule],
            config: MatchConfig::All,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Str("bad".to_string()));
        assert!(eval_single(&set, &decision).is_err());
    }

    #[test]
    fn function_call_invokes_caller_supplied_function() {
        let schema =
            schema::build_registry("score: Int\nis_big: (x: Int) -> Bool\n", &HashSet::new())
                .unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let mut functions: FunctionMap = HashMap::new();
        functions.insert(
            "is_big".to_string(),
            std::sync::Arc::new(|args: &[Value]| {
                Value::Bool(args[0].as_int().unwrap_or(0) > 1000)
            }),
        );
        let rule = build_rule(&schema, &ops, "is_big(score)", "r");
        let set = CompiledRuleSet {
            rules: vec![rule],
            config: MatchConfig::All,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Int(5000));
        let result = eval_single(&set, &decision).unwrap();
        assert_eq!(result.matched, vec!["r".to_string()]);
    }

    #[test]
    fn repeated_eval_on_unchanged_set_is_deterministic() {
        let schema = schema::build_registry("score: Int\n", &HashSet::new()).unwrap();
        let types = TypeRegistry::new();
        let ops = operators::build_from_preset(Preset::Standard).unwrap();
        let functions = FunctionMap::new();
        let rule = build_rule(&schema, &ops, "score > 0", "r");
        let set = CompiledRuleSet {
            rules: vec![rule],
            config: MatchConfig::All,
            schema: &schema,
            types: &types,
            functions: &functions,
            decisions_mode: DecisionsMode::Strict,
        };
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Int(10));
        let first = eval_single(&set, &decision).unwrap();
        let second = eval_single(&set, &decision).unwrap();
        assert_eq!(first, second);
    }
}
