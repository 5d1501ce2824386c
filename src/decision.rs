//! Decision validator
//!
//! Checks an incoming decision map against the schema registry, field by
//! field, and returns a cleaned map plus any warnings collected in loose
//! mode. No coercion ever happens here — a field whose runtime value
//! kind disagrees with its declared type is a violation, not a
//! conversion opportunity.

use crate::error::{DecisionValidationError, ErrorContext};
use crate::schema::ast::{ConstraintValue, FieldDefinition, Primitive, TypeExpr};
use crate::schema::SchemaRegistry;
use crate::types::TypeRegistry;
use crate::value::{Value, ValueMap};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionsMode {
    Strict,
    Loose,
}

type VResult = Result<(), DecisionValidationError>;

fn violation(message: impl Into<String>, field: &str) -> DecisionValidationError {
    DecisionValidationError {
        message: message.into(),
        context: ErrorContext::new().field(field),
    }
}

/// Validates `decision` against `schema`'s top-level fields, recursing
/// into struct-typed fields. Returns `(cleaned, warnings)` — in strict
/// mode the first violation short-circuits with `Err`; in loose mode
/// every violation is recorded as a warning and the offending field is
/// dropped from `cleaned`.
pub fn validate_decision(
    schema: &SchemaRegistry,
    types: &TypeRegistry,
    mode: DecisionsMode,
    decision: &ValueMap,
) -> Result<(ValueMap, Vec<String>), DecisionValidationError> {
    let mut cleaned = ValueMap::new();
    let mut warnings = Vec::new();

    for field in &schema.ast().fields {
        let outcome = validate_field(
            schema,
            types,
            mode,
            field.name.as_str(),
            field,
            decision.get(&field.name),
            &mut warnings,
        )?;
        if let Some(value) = outcome {
            cleaned.insert(field.name.clone(), value);
        }
    }

    // Extra fields not declared in the schema pass through unchanged.
    let declared: Vec<&str> = schema.ast().fields.iter().map(|f| f.name.as_str()).collect();
    for (key, value) in decision {
        if !declared.contains(&key.as_str()) {
            cleaned.insert(key.clone(), value.clone());
        }
    }

    Ok((cleaned, warnings))
}

/// Records a violation: in strict mode, an immediate `Err`; in loose
/// mode, a warning and `Ok(None)` (the field is dropped from `cleaned`).
/// Shared by every check in `validate_field` so nested struct fields get
/// the same strict/loose treatment as top-level ones — each nested
/// violation becomes its own warning rather than collapsing into one
/// message for the whole struct field.
fn fail(
    mode: DecisionsMode,
    warnings: &mut Vec<String>,
    message: String,
    field: &str,
) -> Result<Option<Value>, DecisionValidationError> {
    match mode {
        DecisionsMode::Strict => Err(violation(message, field)),
        DecisionsMode::Loose => {
            warnings.push(message);
            Ok(None)
        }
    }
}

/// Validates one field's value (top-level or nested). `path` is used
/// only for error/warning messages. Returns `Ok(Some(value))` when the
/// field should appear in the cleaned map, `Ok(None)` when it should be
/// silently skipped (absent optional field, or a loose-mode violation).
fn validate_field(
    schema: &SchemaRegistry,
    types: &TypeRegistry,
    mode: DecisionsMode,
    path: &str,
    field: &FieldDefinition,
    raw: Option<&Value>,
    warnings: &mut Vec<String>,
) -> Result<Option<Value>, DecisionValidationError> {
    let present = raw.is_some_and(|v| !v.is_null());
    if !present {
        if field.optional {
            return Ok(None);
        }
        return fail(
            mode,
            warnings,
            format!("required field '{path}' is missing or null"),
            path,
        );
    }
    let value = raw.expect("present checked above");

    if !type_expr_matches(&field.type_expr, value, schema, types) {
        return fail(
            mode,
            warnings,
            format!(
                "field '{path}' expected type '{}', got '{}'",
                field.type_expr.type_name(),
                value.kind_name()
            ),
            path,
        );
    }

    if let TypeExpr::Named(name) = &field.type_expr {
        if types.has_type(name) {
            if !types.validate(name, value) {
                return fail(
                    mode,
                    warnings,
                    format!("field '{path}' failed custom type '{name}' validation"),
                    path,
                );
            }
        } else if let Some(struct_def) = schema.ast().struct_def(name) {
            let Value::Struct(nested) = value else {
                return fail(mode, warnings, format!("field '{path}' is not a struct"), path);
            };
            for nested_field in &struct_def.fields {
                let nested_path = format!("{path}.{}", nested_field.name);
                validate_field(
                    schema,
                    types,
                    mode,
                    &nested_path,
                    nested_field,
                    nested.get(&nested_field.name),
                    warnings,
                )?;
            }
        }
    }

    if let TypeExpr::List(members) = &field.type_expr {
        let Value::List(items) = value else {
            return fail(mode, warnings, format!("field '{path}' is not a list"), path);
        };
        for (i, item) in items.iter().enumerate() {
            if !members
                .iter()
                .any(|m| type_expr_matches(m, item, schema, types))
            {
                return fail(
                    mode,
                    warnings,
                    format!("field '{path}[{i}]' does not match element type"),
                    path,
                );
            }
        }
    }

    if let Err(e) = check_constraints(field, value, path, types) {
        return fail(mode, warnings, e.message, path);
    }

    Ok(Some(value.clone()))
}

fn type_expr_matches(
    type_expr: &TypeExpr,
    value: &Value,
    schema: &SchemaRegistry,
    types: &TypeRegistry,
) -> bool {
    match type_expr {
        TypeExpr::Primitive(Primitive::Int) => matches!(value, Value::Int(_)),
        TypeExpr::Primitive(Primitive::Float) => matches!(value, Value::Int(_) | Value::Float(_)),
        TypeExpr::Primitive(Primitive::Str) => matches!(value, Value::Str(_)),
        TypeExpr::Primitive(Primitive::Bool) => matches!(value, Value::Bool(_)),
        TypeExpr::List(_) => matches!(value, Value::List(_)),
        TypeExpr::Named(name) => {
            if let Some(base) = types.get_base(name) {
                type_expr_matches(&TypeExpr::Primitive(base), value, schema, types)
            } else if schema.is_struct(name) {
                matches!(value, Value::Struct(_))
            } else {
                false
            }
        }
    }
}

fn check_constraints(
    field: &FieldDefinition,
    value: &Value,
    path: &str,
    types: &TypeRegistry,
) -> VResult {
    for (key, constraint) in &field.constraints {
        let ok = match key.as_str() {
            "min" => numeric(value) >= numeric(&constraint.to_value()),
            "max" => numeric(value) <= numeric(&constraint.to_value()),
            "exclusiveMin" => numeric(value) > numeric(&constraint.to_value()),
            "exclusiveMax" => numeric(value) < numeric(&constraint.to_value()),
            "minLength" => str_len(value) >= int_constraint(constraint),
            "maxLength" => str_len(value) <= int_constraint(constraint),
            "exactLength" => str_len(value) == int_constraint(constraint),
            "pattern" => check_pattern(value, constraint),
            "format" => check_format(value, constraint, types),
            "oneOf" => match constraint {
                ConstraintValue::List(items) => items.iter().any(|c| &c.to_value() == value),
                _ => true,
            },
            "const" => &constraint.to_value() == value,
            "minItems" => list_len(value) >= int_constraint(constraint),
            "maxItems" => list_len(value) <= int_constraint(constraint),
            "exactItems" => list_len(value) == int_constraint(constraint),
            "unique" => check_unique(value),
            _ => true,
        };
        if !ok {
            return Err(violation(
                format!("field '{path}' violates constraint '{key}'"),
                path,
            ));
        }
    }
    Ok(())
}

/// `format: 'email'` re-validates the value against the identically
/// named registered custom type's validator (an Open Question in
/// spec.md §9, resolved in SPEC_FULL.md §4.4). An unknown format name
/// fails validation rather than passing silently.
fn check_format(value: &Value, constraint: &ConstraintValue, types: &TypeRegistry) -> bool {
    match constraint {
        ConstraintValue::Str(name) => types.has_type(name) && types.validate(name, value),
        _ => true,
    }
}

fn numeric(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

fn int_constraint(c: &ConstraintValue) -> usize {
    match c {
        ConstraintValue::Int(i) => (*i).max(0) as usize,
        _ => usize::MAX,
    }
}

fn str_len(value: &Value) -> usize {
    value.as_str().map(|s| s.chars().count()).unwrap_or(usize::MAX)
}

fn list_len(value: &Value) -> usize {
    value.as_list().map(|l| l.len()).unwrap_or(usize::MAX)
}

fn check_unique(value: &Value) -> bool {
    let Some(items) = value.as_list() else {
        return true;
    };
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            if a == b {
                return false;
            }
        }
    }
    true
}

/// An invalid regex pattern is treated as a non-match rather than a
/// panic — the schema parser doesn't validate `pattern`'s contents, so
/// a malformed pattern must fail safely here.
fn check_pattern(value: &Value, constraint: &ConstraintValue) -> bool {
    match (value.as_str(), constraint) {
        (Some(s), ConstraintValue::Str(pattern)) => {
            Regex::new(pattern).is_ok_and(|re| re.is_match(s))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use std::collections::HashSet;

    fn schema_registry(src: &str) -> SchemaRegistry {
        schema::build_registry(src, &HashSet::new()).unwrap()
    }

    #[test]
    fn required_field_missing_is_strict_error() {
        let schema = schema_registry("score: Int\n");
        let types = TypeRegistry::new();
        let decision = ValueMap::new();
        let result = validate_decision(&schema, &types, DecisionsMode::Strict, &decision);
        assert!(result.is_err());
    }

    #[test]
    fn required_field_missing_in_loose_mode_warns_and_omits() {
        let schema = schema_registry("score: Int\n");
        let types = TypeRegistry::new();
        let decision = ValueMap::new();
        let (cleaned, warnings) =
            validate_decision(&schema, &types, DecisionsMode::Loose, &decision).unwrap();
        assert!(!cleaned.contains_key("score"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("score"));
    }

    #[test]
    fn optional_field_missing_is_silently_skipped() {
        let schema = schema_registry("score: Int?\n");
        let types = TypeRegistry::new();
        let decision = ValueMap::new();
        let (cleaned, warnings) =
            validate_decision(&schema, &types, DecisionsMode::Strict, &decision).unwrap();
        assert!(!cleaned.contains_key("score"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn base_type_mismatch_is_rejected_without_coercion() {
        let schema = schema_registry("score: Int\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Str("bad".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_err());
    }

    #[test]
    fn int_value_is_rejected_for_bool_field() {
        let schema = schema_registry("active: Bool\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("active".to_string(), Value::Int(1));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_err());
    }

    #[test]
    fn float_field_accepts_int_or_float() {
        let schema = schema_registry("ratio: Float\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("ratio".to_string(), Value::Int(1));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_ok());
    }

    #[test]
    fn min_max_constraints_enforced() {
        let schema = schema_registry("score: Int {min: 0, max: 100}\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Int(150));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_err());
    }

    #[test]
    fn custom_type_validator_is_applied() {
        let schema = schema_registry("ip: ipv4\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("ip".to_string(), Value::Str("10.0.0.1".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_ok());

        let mut bad = ValueMap::new();
        bad.insert("ip".to_string(), Value::Str("not-an-ip".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &bad).is_err());
    }

    #[test]
    fn nested_struct_field_validated_recursively() {
        let schema = schema_registry("struct Addr { city: Str }\naddr: Addr\n");
        let types = TypeRegistry::new();
        let mut city = ValueMap::new();
        city.insert("city".to_string(), Value::Int(5));
        let mut decision = ValueMap::new();
        decision.insert("addr".to_string(), Value::Struct(city));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_err());
    }

    #[test]
    fn loose_mode_collects_one_warning_per_nested_violation() {
        let schema = schema_registry(
            "struct Addr { city: Str, zip: Int }\naddr: Addr\nscore: Int\n",
        );
        let types = TypeRegistry::new();
        let mut city = ValueMap::new();
        city.insert("city".to_string(), Value::Int(5));
        city.insert("zip".to_string(), Value::Str("bad".to_string()));
        let mut decision = ValueMap::new();
        decision.insert("addr".to_string(), Value::Struct(city));
        let (_, warnings) =
            validate_decision(&schema, &types, DecisionsMode::Loose, &decision).unwrap();
        // addr.city, addr.zip, and the missing top-level `score` each warn once.
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn extra_fields_pass_through_unchanged() {
        let schema = schema_registry("score: Int\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("score".to_string(), Value::Int(1));
        decision.insert("untracked".to_string(), Value::Str("x".to_string()));
        let (cleaned, _) =
            validate_decision(&schema, &types, DecisionsMode::Strict, &decision).unwrap();
        assert_eq!(cleaned.get("untracked"), Some(&Value::Str("x".to_string())));
    }

    #[test]
    fn list_element_type_is_checked() {
        let schema = schema_registry("tags: List[Str]\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert(
            "tags".to_string(),
            Value::List(vec![Value::Str("a".into()), Value::Int(1)]),
        );
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_err());
    }

    #[test]
    fn format_constraint_revalidates_against_named_custom_type() {
        let schema = schema_registry("contact: Str {format: 'email'}\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("contact".to_string(), Value::Str("a@b.com".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_ok());

        let mut bad = ValueMap::new();
        bad.insert("contact".to_string(), Value::Str("not-an-email".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &bad).is_err());
    }

    #[test]
    fn pattern_constraint_matches_regex() {
        let schema = schema_registry("code: Str {pattern: '^[A-Z]{3}$'}\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert("code".to_string(), Value::Str("ABC".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_ok());

        let mut bad = ValueMap::new();
        bad.insert("code".to_string(), Value::Str("abc".to_string()));
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &bad).is_err());
    }

    #[test]
    fn unique_constraint_rejects_duplicates() {
        let schema = schema_registry("tags: List[Str] {unique: true}\n");
        let types = TypeRegistry::new();
        let mut decision = ValueMap::new();
        decision.insert(
            "tags".to_string(),
            Value::List(vec![Value::Str("a".into()), Value::Str("a".into())]),
        );
        assert!(validate_decision(&schema, &types, DecisionsMode::Strict, &decision).is_err());
    }
}
