//! Rule AST
//!
//! Produced by the Pratt parser (`rule::parser`). Every node carries a
//! resolved `type_name` — for unresolved-but-wildcard-matched operators
//! this is the sentinel `"Any"`, downgraded to a hard parse failure only
//! when not even a wildcard operator matches (spec.md §4.6/§4.7).

use crate::operators::OperatorFn;
use crate::value::Value;

#[derive(Clone)]
pub enum RuleNode {
    Literal {
        value: Value,
        type_name: String,
    },
    Variable {
        dotted_name: String,
        type_name: String,
    },
    UnaryOp {
        token: String,
        operand: Box<RuleNode>,
        type_name: String,
        func: OperatorFn,
    },
    BinaryOp {
        token: String,
        left: Box<RuleNode>,
        right: Box<RuleNode>,
        type_name: String,
        func: OperatorFn,
    },
    FunctionCall {
        name: String,
        args: Vec<RuleNode>,
        type_name: String,
    },
    ListLiteral {
        items: Vec<RuleNode>,
        type_name: String,
    },
}

impl RuleNode {
    pub fn type_name(&self) -> &str {
        match self {
            RuleNode::Literal { type_name, .. }
            | RuleNode::Variable { type_name, .. }
            | RuleNode::UnaryOp { type_name, .. }
            | RuleNode::BinaryOp { type_name, .. }
            | RuleNode::FunctionCall { type_name, .. }
            | RuleNode::ListLiteral { type_name, .. } => type_name,
        }
    }
}

#[derive(Clone)]
pub struct RuleAst {
    pub root: RuleNode,
    pub return_type: String,
}
