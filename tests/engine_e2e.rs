//! End-to-end scenarios against the public `Engine` API, covering
//! spec.md §8's named testable properties.

use rules_engine::engine::{Engine, EngineOptions, RuleSpec};
use rules_engine::matcher::MatchConfig;
use rules_engine::value::{Value, ValueMap};

fn decision(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn simple_decline_scenario() {
    let engine =
        Engine::load_schema("credit_score: Int\n", EngineOptions::default()).unwrap();
    let rules = vec![RuleSpec::new("low_credit", "credit_score < 600")];
    let result = engine
        .eval(
            &rules,
            &decision(&[("credit_score", Value::Int(580))]),
            None,
        )
        .unwrap();
    assert_eq!(result.matched, vec!["low_credit".to_string()]);
}

#[test]
fn first_match_by_ordering_scenario() {
    let engine = Engine::load_schema("credit_score: Int\n", EngineOptions::default()).unwrap();
    let mut low = RuleSpec::new("tier_low", "credit_score < 700");
    low.metadata.insert("ordering".to_string(), Value::Int(1));
    let mut any = RuleSpec::new("tier_any", "credit_score > 0");
    any.metadata.insert("ordering".to_string(), Value::Int(2));
    let rules = vec![low, any];
    let result = engine
        .eval(
            &rules,
            &decision(&[("credit_score", Value::Int(650))]),
            Some(MatchConfig::first_default()),
        )
        .unwrap();
    assert_eq!(result.matched, vec!["tier_low".to_string()]);
}

#[test]
fn score_aggregation_scenario() {
    let engine = Engine::load_schema(
        "signal_a: Bool\nsignal_b: Bool\nsignal_c: Int\n",
        EngineOptions::default(),
    )
    .unwrap();
    let rules = vec![
        RuleSpec::new("s1", "signal_a = true"),
        RuleSpec::new("s2", "signal_b = true"),
        RuleSpec::new("s3", "signal_c > 50"),
    ];
    let result = engine
        .eval(
            &rules,
            &decision(&[
                ("signal_a", Value::Bool(true)),
                ("signal_b", Value::Bool(false)),
                ("signal_c", Value::Int(100)),
            ]),
            Some(MatchConfig::score_default()),
        )
        .unwrap();
    assert_eq!(result.score, Some(2.0));
}

#[test]
fn inverse_eligibility_scenario() {
    let engine = Engine::load_schema(
        "state_code: Str\ncredit_score: Int\n",
        EngineOptions::default(),
    )
    .unwrap();
    let rules = vec![
        RuleSpec::new("eligible_state", "state_code not in ['CA', 'NY']"),
        RuleSpec::new("eligible_credit", "credit_score >= 600"),
    ];
    let result = engine
        .eval(
            &rules,
            &decision(&[
                ("state_code", Value::Str("TX".to_string())),
                ("credit_score", Value::Int(500)),
            ]),
            Some(MatchConfig::Inverse),
        )
        .unwrap();
    assert_eq!(result.excluded, vec!["eligible_credit".to_string()]);
}

#[test]
fn struct_dot_notation_scenario() {
    let engine = Engine::load_schema(
        "struct Addr { city: Str }\naddr: Addr\n",
        EngineOptions::default(),
    )
    .unwrap();
    let rules = vec![RuleSpec::new("in_sf", "addr.city = 'SF'")];
    let mut addr = ValueMap::new();
    addr.insert("city".to_string(), Value::Str("SF".to_string()));
    let result = engine
        .eval(&rules, &decision(&[("addr", Value::Struct(addr))]), None)
        .unwrap();
    assert_eq!(result.matched, vec!["in_sf".to_string()]);
}

#[test]
fn loose_decisions_mode_warns_instead_of_raising() {
    let mut options = EngineOptions::default();
    options.decisions_mode = rules_engine::decision::DecisionsMode::Loose;
    let engine = Engine::load_schema("score: Int\n", options).unwrap();
    let rules = vec![RuleSpec::new("positive", "score > 0")];
    let result = engine
        .eval(
            &rules,
            &decision(&[("score", Value::Str("not-a-number".to_string()))]),
            None,
        )
        .unwrap();
    assert!(result.matched.is_empty());
    assert!(!result.warnings.is_empty());
}

#[test]
fn strict_decisions_mode_raises_on_invalid_decision() {
    let mut options = EngineOptions::default();
    options.decisions_mode = rules_engine::decision::DecisionsMode::Strict;
    let engine = Engine::load_schema("score: Int\n", options).unwrap();
    let rules = vec![RuleSpec::new("positive", "score > 0")];
    let err = engine.eval(
        &rules,
        &decision(&[("score", Value::Str("not-a-number".to_string()))]),
        None,
    );
    assert!(err.is_err());
}

#[test]
fn repeated_eval_is_deterministic() {
    let engine = Engine::load_schema("score: Int\n", EngineOptions::default()).unwrap();
    let rules = vec![RuleSpec::new("positive", "score > 0")];
    let d = decision(&[("score", Value::Int(10))]);
    let first = engine.eval(&rules, &d, None).unwrap();
    let second = engine.eval(&rules, &d, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn schema_export_round_trips_through_reload() {
    let engine =
        Engine::load_schema("score: Int {min: 0, max: 100}\n", EngineOptions::default()).unwrap();
    let exported = engine.export_schema();
    let reloaded = Engine::load_schema(&exported, EngineOptions::default()).unwrap();
    assert!(reloaded.schema().get_field("score").is_some());
}
