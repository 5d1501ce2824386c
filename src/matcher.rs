//! Match configuration and result aggregation
//!
//! A `MatchConfig` is recognized by the engine's `compile`/`eval` calls
//! (spec.md §6.4); `aggregate` turns per-rule raw values into a
//! `MatchResult` according to the configured mode.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchConfig {
    All,
    First { key: String, order: SortOrder },
    Inverse,
    Score {
        aggregate: String,
        threshold: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig::All
    }
}

impl MatchConfig {
    pub fn first_default() -> Self {
        MatchConfig::First {
            key: "ordering".to_string(),
            order: SortOrder::Asc,
        }
    }

    pub fn score_default() -> Self {
        MatchConfig::Score {
            aggregate: "sum".to_string(),
            threshold: None,
        }
    }
}

/// Caller-supplied keys alongside a rule's id, used by `first` mode's
/// sort key lookup (default key `"ordering"`).
#[derive(Debug, Clone, Default)]
pub struct RuleMetadata(pub std::collections::BTreeMap<String, Value>);

impl RuleMetadata {
    pub fn as_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub id: Option<String>,
    pub matched: Vec<String>,
    pub excluded: Vec<String>,
    pub score: Option<f64>,
    pub warnings: Vec<String>,
}

/// One rule's id, raw evaluated value, and caller-supplied metadata —
/// the unit `aggregate` consumes.
pub struct RuleOutcome<'a> {
    pub id: &'a str,
    pub value: &'a Value,
    pub metadata: &'a RuleMetadata,
}

/// Aggregates per-rule outcomes per spec.md §4.9 step 4. `decision_id`
/// and `warnings` come from decision validation (step 1); `outcomes`
/// are produced by step 2/3 (evaluate then demote exceptions to
/// falsy).
pub fn aggregate(
    config: &MatchConfig,
    outcomes: &[RuleOutcome<'_>],
    decision_id: Option<String>,
    warnings: Vec<String>,
) -> MatchResult {
    match config {
        MatchConfig::All => {
            let matched = outcomes
                .iter()
                .filter(|o| o.value.is_truthy())
                .map(|o| o.id.to_string())
                .collect();
            MatchResult {
                id: decision_id,
                matched,
                excluded: Vec::new(),
                score: None,
                warnings,
            }
        }
        MatchConfig::First { key, order } => {
            let mut truthy: Vec<&RuleOutcome<'_>> =
                outcomes.iter().filter(|o| o.value.is_truthy()).collect();
            truthy.sort_by(|a, b| {
                let ka = a.metadata.as_f64(key).unwrap_or(0.0);
                let kb = b.metadata.as_f64(key).unwrap_or(0.0);
                match order {
                    SortOrder::Asc => ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal),
                    SortOrder::Desc => kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal),
                }
            });
            let matched = truthy
                .first()
                .map(|o| vec![o.id.to_string()])
                .unwrap_or_default();
            MatchResult {
                id: decision_id,
                matched,
                excluded: Vec::new(),
                score: None,
                warnings,
            }
        }
        MatchConfig::Inverse => {
            let excluded = outcomes
                .iter()
                .filter(|o| !o.value.is_truthy())
                .map(|o| o.id.to_string())
                .collect();
            MatchResult {
                id: decision_id,
                matched: Vec::new(),
                excluded,
                score: None,
                warnings,
            }
        }
        MatchConfig::Score { threshold, .. } => {
            // `aggregate` values other than "sum" are accepted but
            // currently behave as "sum" (spec.md §9: "other values
            // reserved").
            let total: f64 = outcomes
                .iter()
                .map(|o| match o.value {
                    Value::Bool(true) => 1.0,
                    Value::Bool(false) => 0.0,
                    Value::Int(i) => *i as f64,
                    Value::Float(f) => *f,
                    _ => 0.0,
                })
                .sum();
            let matched = match threshold {
                Some(t) if total >= *t => outcomes
                    .iter()
                    .filter(|o| o.value.is_truthy())
                    .map(|o| o.id.to_string())
                    .collect(),
                Some(_) => Vec::new(),
                None => Vec::new(),
            };
            MatchResult {
                id: decision_id,
                matched,
                excluded: Vec::new(),
                score: Some(total),
                warnings,
            }
        }
    }
}
