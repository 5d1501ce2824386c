//! Pratt parser for rule expressions
//!
//! Dispatches nud/led using the operator registry rather than a fixed
//! grammar table, so adding an operator via
//! `Engine::register_operator` changes what the parser accepts without
//! touching this file. Every produced node carries a resolved
//! `type_name` — an operator's own declared `return_type`, found via
//! either an exact or a wildcard operand match. `"Any"` marks a
//! genuinely unresolved callee (an undeclared function), whose
//! strict/loose handling is deferred to the compiler (spec.md §4.7).

use crate::error::{ErrorContext, RuleParseError};
use crate::operators::{Fixity, OperatorDef, OperatorRegistry};
use crate::rule::ast::{RuleAst, RuleNode};
use crate::rule::lexer::{self, RTok};
use crate::schema::SchemaRegistry;
use crate::value::Value;

type PResult<T> = Result<T, RuleParseError>;

fn err(message: impl Into<String>) -> RuleParseError {
    RuleParseError {
        message: message.into(),
        context: ErrorContext::new(),
    }
}

pub struct RuleParser<'a> {
    tokens: Vec<RTok>,
    pos: usize,
    schema: &'a SchemaRegistry,
    operators: &'a OperatorRegistry,
}

impl<'a> RuleParser<'a> {
    pub fn parse(
        src: &str,
        schema: &'a SchemaRegistry,
        operators: &'a OperatorRegistry,
    ) -> PResult<RuleAst> {
        let extra_symbols: Vec<String> = operators
            .tokens()
            .filter(|t| is_symbol_token(t))
            .map(String::from)
            .collect();
        let tokens = lexer::tokenize(src, &extra_symbols)?;
        let mut parser = RuleParser {
            tokens,
            pos: 0,
            schema,
            operators,
        };
        let root = parser.parse_expr(0)?;
        if !matches!(parser.peek(), RTok::Eof) {
            return Err(err(format!(
                "unexpected trailing token {:?}",
                parser.peek()
            )));
        }
        let return_type = root.type_name().to_string();
        Ok(RuleAst { root, return_type })
    }

    fn peek(&self) -> &RTok {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &RTok {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> RTok {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &RTok) -> PResult<()> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(err(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    /// Current operator token, if the upcoming tokens spell one out —
    /// combining `not`+`in` into the single logical token `"not in"`.
    /// Returns the token string and how many raw tokens it consumed.
    fn peek_operator_token(&self) -> Option<(String, usize)> {
        match self.peek() {
            RTok::Ident(s) if s == "not" && matches!(self.peek_at(1), RTok::Ident(n) if n == "in") => {
                Some(("not in".to_string(), 2))
            }
            RTok::Ident(s) if self.operators.has_token(s) => Some((s.clone(), 1)),
            RTok::Symbol(s) if self.operators.has_token(s) => Some((s.clone(), 1)),
            _ => None,
        }
    }

    fn parse_expr(&mut self, min_bp: u32) -> PResult<RuleNode> {
        let mut left = self.nud()?;
        loop {
            let Some((token, consumed)) = self.peek_operator_token() else {
                break;
            };
            let Some(bp) = self.operators.get_binding_power(&token) else {
                break;
            };
            if self.operators.get_fixity(&token) != Some(Fixity::Infix) {
                break;
            }
            if bp <= min_bp {
                break;
            }
            for _ in 0..consumed {
                self.advance();
            }
            left = self.led(&token, bp, left)?;
        }
        Ok(left)
    }

    fn nud(&mut self) -> PResult<RuleNode> {
        match self.peek().clone() {
            RTok::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(&RTok::RParen)?;
                Ok(inner)
            }
            RTok::LBracket => self.parse_list_literal(),
            RTok::Int(i) => {
                self.advance();
                Ok(RuleNode::Literal {
                    value: Value::Int(i),
                    type_name: "Int".to_string(),
                })
            }
            RTok::Float(f) => {
                self.advance();
                Ok(RuleNode::Literal {
                    value: Value::Float(f),
                    type_name: "Float".to_string(),
                })
            }
            RTok::Str(s) => {
                self.advance();
                Ok(RuleNode::Literal {
                    value: Value::Str(s),
                    type_name: "Str".to_string(),
                })
            }
            RTok::Bool(b) => {
                self.advance();
                Ok(RuleNode::Literal {
                    value: Value::Bool(b),
                    type_name: "Bool".to_string(),
                })
            }
            RTok::Ident(name) => {
                // A prefix operator token (e.g. `not`) takes priority
                // over treating the identifier as a variable/call name.
                if self.operators.get_fixity(&name) == Some(Fixity::Prefix) {
                    return self.parse_prefix_op(name);
                }
                self.advance();
                if matches!(self.peek(), RTok::LParen) {
                    self.parse_function_call(name)
                } else {
                    self.parse_variable(name)
                }
            }
            other => Err(err(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_prefix_op(&mut self, name: String) -> PResult<RuleNode> {
        self.advance();
        let bp = self
            .operators
            .get_binding_power(&name)
            .ok_or_else(|| err(format!("prefix operator '{name}' has no binding power")))?;
        let operand = self.parse_expr(bp)?;
        let operand_type = operand.type_name().to_string();
        let (def, type_name) = resolve_operator(self.operators, &name, &[&operand_type])?;
        Ok(RuleNode::UnaryOp {
            token: name,
            operand: Box::new(operand),
            type_name,
            func: def.func,
        })
    }

    fn parse_list_literal(&mut self) -> PResult<RuleNode> {
        self.advance(); // '['
        let mut items = Vec::new();
        while !matches!(self.peek(), RTok::RBracket) {
            items.push(self.parse_list_item()?);
            if matches!(self.peek(), RTok::Comma) {
                self.advance();
            }
        }
        self.expect(&RTok::RBracket)?;
        Ok(RuleNode::ListLiteral {
            items,
            type_name: "List".to_string(),
        })
    }

    /// List literal elements are atoms, not general sub-expressions
    /// (spec.md §4.6: "list literal `[lit, …]`").
    fn parse_list_item(&mut self) -> PResult<RuleNode> {
        match self.advance() {
            RTok::Int(i) => Ok(RuleNode::Literal {
                value: Value::Int(i),
                type_name: "Int".to_string(),
            }),
            RTok::Float(f) => Ok(RuleNode::Literal {
                value: Value::Float(f),
                type_name: "Float".to_string(),
            }),
            RTok::Str(s) => Ok(RuleNode::Literal {
                value: Value::Str(s),
                type_name: "Str".to_string(),
            }),
            RTok::Bool(b) => Ok(RuleNode::Literal {
                value: Value::Bool(b),
                type_name: "Bool".to_string(),
            }),
            other => Err(err(format!("expected list literal item, found {other:?}"))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> PResult<RuleNode> {
        self.advance(); // '('
        let mut args = Vec::new();
        while !matches!(self.peek(), RTok::RParen) {
            args.push(self.parse_expr(0)?);
            if matches!(self.peek(), RTok::Comma) {
                self.advance();
            }
        }
        self.expect(&RTok::RParen)?;
        let type_name = self
            .schema
            .ast()
            .function_sig(&name)
            .map(|sig| sig.return_type.type_name())
            .unwrap_or_else(|| "Any".to_string());
        Ok(RuleNode::FunctionCall {
            name,
            args,
            type_name,
        })
    }

    fn parse_variable(&mut self, first: String) -> PResult<RuleNode> {
        let mut path = first;
        while matches!(self.peek(), RTok::Dot) {
            self.advance();
            let RTok::Ident(segment) = self.advance() else {
                return Err(err("expected field name after '.'"));
            };
            path.push('.');
            path.push_str(&segment);
        }
        let field = self
            .schema
            .get_field(&path)
            .ok_or_else(|| err(format!("Unknown field '{path}'")))?;
        Ok(RuleNode::Variable {
            dotted_name: path,
            type_name: field.type_expr.type_name(),
        })
    }

    fn led(&mut self, token: &str, bp: u32, left: RuleNode) -> PResult<RuleNode> {
        let right_min_bp = match self.operators.get_associativity(token) {
            Some(crate::operators::Associativity::Right) => bp - 1,
            _ => bp,
        };
        let right = self.parse_expr(right_min_bp)?;
        let left_type = left.type_name().to_string();
        let right_type = right.type_name().to_string();
        let (def, type_name) = resolve_operator(self.operators, token, &[&left_type, &right_type])?;
        Ok(RuleNode::BinaryOp {
            token: token.to_string(),
            left: Box::new(left),
            right: Box::new(right),
            type_name,
            func: def.func,
        })
    }
}

/// Resolves `token` against `operand_types`: exact match first, then a
/// wildcard match. Either way the node's `type_name` is the matched
/// definition's own declared `return_type` — an operator whose
/// signature legitimately contains a wildcard slot (`in`, `not in`,
/// `contains`) still declares a concrete return type (`Bool`), and that
/// declaration, not the wildcard wiring used to find it, is what the
/// compiler should see. Neither matching is a hard parse failure
/// regardless of rules mode — spec.md §4.6's "fail with RuleParseError
/// if unresolved" applies only when no definition at all (exact or
/// wildcard) matches.
fn resolve_operator(
    registry: &OperatorRegistry,
    token: &str,
    operand_types: &[&str],
) -> PResult<(OperatorDef, String)> {
    if let Some(def) = registry.lookup_exact(token, operand_types) {
        return Ok((def.clone(), def.return_type.clone()));
    }
    if let Some(def) = registry.lookup_wildcard(token, operand_types) {
        return Ok((def.clone(), def.return_type.clone()));
    }
    Err(err(format!(
        "no operator '{token}' for operand types {operand_types:?}"
    )))
}

fn is_symbol_token(token: &str) -> bool {
    !token.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
}
