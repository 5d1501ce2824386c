//! Typed compiler: rule AST -> evaluator tree
//!
//! Per the REDESIGN FLAGS in spec.md §9, "closure trees" are
//! represented here as an algebraic data type (`CompiledNode`) with an
//! `evaluate` method, rather than literal boxed closures — behaviorally
//! identical to the closure-per-node design the spec describes, but
//! easier to reason about and to keep `Send + Sync` in a statically
//! typed target.

use crate::error::{ErrorContext, RuleEvaluationError, TypeMismatchError};
use crate::operators::{Associativity, Fixity, OperandType, OperatorDef, OperatorFn, Preset};
use crate::rule::ast::{RuleAst, RuleNode};
use crate::value::{Value, ValueMap};
use std::collections::HashMap;
use std::sync::Arc;

/// A caller-supplied function: `(args) -> Value`. Modeled the same way
/// as an operator implementation — a reified signature (the schema's
/// `FunctionSignature`) paired with an opaque callable, rather than
/// runtime introspection of the callable itself.
pub type UserFunction = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
pub type FunctionMap = HashMap<String, UserFunction>;

pub type EvalResult = Result<Value, RuleEvaluationError>;

fn eval_err(message: impl Into<String>) -> RuleEvaluationError {
    RuleEvaluationError {
        message: message.into(),
        context: ErrorContext::new(),
    }
}

/// Short-circuiting boolean connective. Hand-coded here rather than
/// dispatched through a registered operator function, per spec.md §4.7
/// and the REDESIGN FLAGS in §9 — the operator registry still records
/// `and`/`or` for consistent binding power and type-checking, but this
/// is what actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// The evaluator tree. Each node, given a decision and the function
/// map, produces a `Value` or a `RuleEvaluationError` that the
/// evaluator shell (see `evaluator::run`) demotes to a falsy result.
#[derive(Clone)]
pub enum CompiledNode {
    Literal(Value),
    ListLiteral(Vec<CompiledNode>),
    /// Reads a dotted path from the decision map. A missing
    /// intermediate key is a `RuleEvaluationError`, not a panic.
    Variable { dotted_path: Vec<String> },
    UnaryOp {
        operand: Box<CompiledNode>,
        func: OperatorFn,
    },
    ShortCircuit {
        op: LogicalOp,
        left: Box<CompiledNode>,
        right: Box<CompiledNode>,
    },
    BinaryOp {
        left: Box<CompiledNode>,
        right: Box<CompiledNode>,
        func: OperatorFn,
    },
    FunctionCall {
        name: String,
        args: Vec<CompiledNode>,
    },
}

impl CompiledNode {
    pub fn evaluate(&self, decision: &ValueMap, functions: &FunctionMap) -> EvalResult {
        match self {
            CompiledNode::Literal(v) => Ok(v.clone()),
            CompiledNode::ListLiteral(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.evaluate(decision, functions)?);
                }
                Ok(Value::List(out))
            }
            CompiledNode::Variable { dotted_path } => read_dotted_path(decision, dotted_path),
            CompiledNode::UnaryOp { operand, func } => {
                let v = operand.evaluate(decision, functions)?;
                Ok(func(&[v]))
            }
            CompiledNode::ShortCircuit { op, left, right } => {
                let l = left.evaluate(decision, functions)?;
                match op {
                    LogicalOp::And => {
                        if !l.is_truthy() {
                            Ok(Value::Bool(false))
                        } else {
                            let r = right.evaluate(decision, functions)?;
                            Ok(Value::Bool(r.is_truthy()))
                        }
                    }
                    LogicalOp::Or => {
                        if l.is_truthy() {
                            Ok(Value::Bool(true))
                        } else {
                            let r = right.evaluate(decision, functions)?;
                            Ok(Value::Bool(r.is_truthy()))
                        }
                    }
                }
            }
            CompiledNode::BinaryOp { left, right, func } => {
                let l = left.evaluate(decision, functions)?;
                let r = right.evaluate(decision, functions)?;
                Ok(func(&[l, r]))
            }
            CompiledNode::FunctionCall { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(a.evaluate(decision, functions)?);
                }
                match functions.get(name) {
                    Some(f) => Ok(f(&values)),
                    None => Err(eval_err(format!("unknown function '{name}'"))),
                }
            }
        }
    }
}

fn read_dotted_path(decision: &ValueMap, path: &[String]) -> EvalResult {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| eval_err("empty variable path"))?;
    let mut current = decision
        .get(first)
        .ok_or_else(|| eval_err(format!("missing field '{first}'")))?;
    for segment in rest {
        let Value::Struct(map) = current else {
            return Err(eval_err(format!("'{segment}' is not a field of a struct value")));
        };
        current = map
            .get(segment)
            .ok_or_else(|| eval_err(format!("missing field '{segment}'")))?;
    }
    if current.is_null() {
        return Err(eval_err(format!("field '{}' is null", path.join("."))));
    }
    Ok(current.clone())
}

/// Strict vs loose type-checking behavior for rule compilation (spec.md
/// §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesMode {
    Strict,
    Loose,
}

/// Compiles a type-checked rule AST into an evaluator tree.
///
/// The AST produced by the Pratt parser (`rule::parser`) has already
/// resolved operator functions via `lookup_by_types` at parse time —
/// this pass just lowers each `RuleNode` into the matching
/// `CompiledNode`, threading `mode` through so an unresolved wildcard
/// fallback recorded during parsing can still raise `TypeMismatchError`
/// here in strict mode if it slipped through as `Any`.
pub fn compile(
    ast: &RuleAst,
    mode: RulesMode,
    warnings: &mut Vec<String>,
) -> Result<CompiledNode, TypeMismatchError> {
    compile_node(&ast.root, mode, warnings)
}

fn compile_node(
    node: &RuleNode,
    mode: RulesMode,
    warnings: &mut Vec<String>,
) -> Result<CompiledNode, TypeMismatchError> {
    match node {
        RuleNode::Literal { value, .. } => Ok(CompiledNode::Literal(value.clone())),
        RuleNode::Variable { dotted_name, .. } => Ok(CompiledNode::Variable {
            dotted_path: dotted_name.split('.').map(str::to_string).collect(),
        }),
        RuleNode::ListLiteral { items, .. } => {
            let mut compiled = Vec::with_capacity(items.len());
            for item in items {
                compiled.push(compile_node(item, mode, warnings)?);
            }
            Ok(CompiledNode::ListLiteral(compiled))
        }
        RuleNode::UnaryOp {
            token,
            operand,
            type_name,
            func,
        } => {
            let operand_c = compile_node(operand, mode, warnings)?;
            if type_name == "Any" {
                let message =
                    format!("operator '{token}' has no exact type match; falling back to Any");
                match mode {
                    RulesMode::Strict => {
                        return Err(TypeMismatchError {
                            message,
                            context: ErrorContext::new().field(token),
                        });
                    }
                    RulesMode::Loose => warnings.push(message),
                }
            }
            Ok(CompiledNode::UnaryOp {
                operand: Box::new(operand_c),
                func: func.clone(),
            })
        }
        RuleNode::BinaryOp {
            token,
            left,
            right,
            func,
            type_name,
            ..
        } => {
            let left_c = compile_node(left, mode, warnings)?;
            let right_c = compile_node(right, mode, warnings)?;
            if token == "and" || token == "or" {
                let op = if token == "and" {
                    LogicalOp::And
                } else {
                    LogicalOp::Or
                };
                return Ok(CompiledNode::ShortCircuit {
                    op,
                    left: Box::new(left_c),
                    right: Box::new(right_c),
                });
            }
            if type_name == "Any" {
                let message = format!("operator '{token}' has no exact type match; falling back to Any");
                match mode {
                    RulesMode::Strict => {
                        return Err(TypeMismatchError {
                            message,
                            context: ErrorContext::new().field(token),
                        });
                    }
                    RulesMode::Loose => warnings.push(message),
                }
            }
            Ok(CompiledNode::BinaryOp {
                left: Box::new(left_c),
                right: Box::new(right_c),
                func: func.clone(),
            })
        }
        RuleNode::FunctionCall { name, args, .. } => {
            let mut compiled = Vec::with_capacity(args.len());
            for a in args {
                compiled.push(compile_node(a, mode, warnings)?);
            }
            Ok(CompiledNode::FunctionCall {
                name: name.clone(),
                args: compiled,
            })
        }
    }
}

// --- Built-in operator implementations & registry defs ---

fn numeric_cmp(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            l.as_f64().zip(r.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
        }
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => false,
    }
}

fn list_membership(element: &Value, list: &Value) -> bool {
    match list {
        Value::List(items) => items.iter().any(|item| values_equal(item, element)),
        _ => false,
    }
}

fn exact(t: &str) -> OperandType {
    OperandType::Exact(t.to_string())
}

fn def(
    token: &str,
    fixity: Fixity,
    binding_power: u32,
    associativity: Associativity,
    input_types: Vec<OperandType>,
    return_type: &str,
    func: OperatorFn,
) -> OperatorDef {
    OperatorDef {
        token: token.to_string(),
        fixity,
        binding_power,
        associativity,
        input_types,
        return_type: return_type.to_string(),
        func,
    }
}

/// Built-in operator definitions for a preset. `and`/`or` are included
/// in every preset (the compiler special-cases their token rather than
/// invoking `func`, but the registry still needs binding power/fixity
/// on file for the parser and for `get_binding_power`). `not` and
/// parentheses/identifiers/literals/calls are the rest of the
/// irreducible minimum — parens/identifiers/literals/calls are parser
/// constructs, not registry entries.
pub fn builtin_operator_defs(preset: Preset) -> Vec<OperatorDef> {
    let mut defs = vec![
        def(
            "or",
            Fixity::Infix,
            10,
            Associativity::Left,
            vec![exact("Bool"), exact("Bool")],
            "Bool",
            Arc::new(|args| Value::Bool(args[0].is_truthy() || args[1].is_truthy())),
        ),
        def(
            "and",
            Fixity::Infix,
            20,
            Associativity::Left,
            vec![exact("Bool"), exact("Bool")],
            "Bool",
            Arc::new(|args| Value::Bool(args[0].is_truthy() && args[1].is_truthy())),
        ),
        def(
            "not",
            Fixity::Prefix,
            30,
            Associativity::Right,
            vec![exact("Bool")],
            "Bool",
            Arc::new(|args| Value::Bool(!args[0].is_truthy())),
        ),
    ];

    if preset == Preset::Minimal {
        return defs;
    }

    let numeric_and_str_pairs = [("Int", "Int"), ("Float", "Float"), ("Str", "Str")];

    for (a, b) in numeric_and_str_pairs {
        defs.push(def(
            "=",
            Fixity::Infix,
            40,
            Associativity::Left,
            vec![exact(a), exact(b)],
            "Bool",
            Arc::new(|args| Value::Bool(values_equal(&args[0], &args[1]))),
        ));
        defs.push(def(
            "!=",
            Fixity::Infix,
            40,
            Associativity::Left,
            vec![exact(a), exact(b)],
            "Bool",
            Arc::new(|args| Value::Bool(!values_equal(&args[0], &args[1]))),
        ));
    }
    defs.push(def(
        "=",
        Fixity::Infix,
        40,
        Associativity::Left,
        vec![exact("Bool"), exact("Bool")],
        "Bool",
        Arc::new(|args| Value::Bool(values_equal(&args[0], &args[1]))),
    ));
    defs.push(def(
        "!=",
        Fixity::Infix,
        40,
        Associativity::Left,
        vec![exact("Bool"), exact("Bool")],
        "Bool",
        Arc::new(|args| Value::Bool(!values_equal(&args[0], &args[1]))),
    ));

    for (a, b) in [("Int", "Int"), ("Float", "Float"), ("Str", "Str")] {
        let arms: [(&str, fn(std::cmp::Ordering) -> bool); 4] = [
            (">", |o| o == std::cmp::Ordering::Greater),
            ("<", |o| o == std::cmp::Ordering::Less),
            (">=", |o| o != std::cmp::Ordering::Less),
            ("<=", |o| o != std::cmp::Ordering::Greater),
        ];
        for (token, cmp) in arms {
            defs.push(def(
                token,
                Fixity::Infix,
                40,
                Associativity::Left,
                vec![exact(a), exact(b)],
                "Bool",
                Arc::new(move |args| {
                    Value::Bool(numeric_cmp(&args[0], &args[1]).is_some_and(cmp))
                }),
            ));
        }
    }

    defs.push(def(
        "in",
        Fixity::Infix,
        40,
        Associativity::Left,
        vec![OperandType::Wildcard, exact("List")],
        "Bool",
        Arc::new(|args| Value::Bool(list_membership(&args[0], &args[1]))),
    ));
    defs.push(def(
        "not in",
        Fixity::Infix,
        40,
        Associativity::Left,
        vec![OperandType::Wildcard, exact("List")],
        "Bool",
        Arc::new(|args| Value::Bool(!list_membership(&args[0], &args[1]))),
    ));
    defs.push(def(
        "contains",
        Fixity::Infix,
        40,
        Associativity::Left,
        vec![exact("List"), OperandType::Wildcard],
        "Bool",
        Arc::new(|args| Value::Bool(list_membership(&args[1], &args[0]))),
    ));
    defs.push(def(
        "contains",
        Fixity::Infix,
        40,
        Associativity::Left,
        vec![exact("Str"), exact("Str")],
        "Bool",
        Arc::new(|args| {
            Value::Bool(
                args[0]
                    .as_str()
                    .zip(args[1].as_str())
                    .is_some_and(|(a, b)| a.contains(b)),
            )
        }),
    ));

    defs
}
