//! Runtime value model
//!
//! `Value` is the dynamic representation flowing through decisions,
//! rule literals, and evaluator results. It is never coerced: an `Int`
//! is never silently read as a `Float`, a `Str` is never parsed as a
//! number. Validation and evaluation both agree on this.

use std::collections::BTreeMap;
use std::fmt;

/// A decision, or a struct-valued field within one: field name to value.
/// `BTreeMap` keeps iteration order stable for deterministic export/debug
/// output, which matters for the round-trip tests in spec.md §8.
pub type ValueMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Struct(ValueMap),
    /// Explicit JSON/decision null. Treated identically to a missing key
    /// by the decision validator (spec.md §4.8: "Missing or null").
    Null,
}

impl Value {
    /// The runtime "kind" name used for base-type checks against a
    /// schema's declared type. Not the same as a schema type name for
    /// structs/custom types — those are checked separately.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Bool(_) => "Bool",
            Value::List(_) => "List",
            Value::Struct(_) => "Struct",
            Value::Null => "Null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness per spec.md §4.9: non-zero numbers, non-empty
    /// strings/lists, `true`. Everything else (including `Null` and
    /// struct values) is falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Struct(_) => false,
            Value::Null => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as `f64`, accepting either `Int` or `Float` — used
    /// by score aggregation and numeric comparisons where the two
    /// numeric kinds interoperate without being "coerced" as schema
    /// types (spec.md treats `Int`/`Float` as distinct declared types,
    /// but arithmetic between two resolved-numeric operands still needs
    /// a common representation).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&ValueMap> {
        match self {
            Value::Struct(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Struct(_) => write!(f, "<struct>"),
            Value::Null => write!(f, "null"),
        }
    }
}
