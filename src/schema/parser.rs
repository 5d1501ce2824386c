//! Schema text parser
//!
//! Tokenizes schema text and parses it into a `SchemaAst`. Whitespace and
//! newlines are significant at the top level (they separate entries);
//! `#` starts a comment that runs to end of line.

use crate::error::{ErrorContext, SchemaParseError};
use crate::schema::ast::{
    ConstraintMap, ConstraintValue, FieldDefinition, FunctionSignature, Parameter, Primitive,
    SchemaAst, StructDefinition, TypeExpr,
};
use std::iter::Peekable;
use std::str::Chars;

type ParseResult<T> = Result<T, SchemaParseError>;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Colon,
    Comma,
    Question,
    Arrow,
    Pipe,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

fn err(message: impl Into<String>, line: usize) -> SchemaParseError {
    SchemaParseError {
        message: message.into(),
        line,
        context: ErrorContext::new(),
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
        }
    }

    fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_spaces_and_comments();
            let line = self.line;
            let Some(&c) = self.chars.peek() else {
                tokens.push(Token {
                    tok: Tok::Eof,
                    line,
                });
                break;
            };
            let tok = match c {
                '\n' => {
                    self.chars.next();
                    self.line += 1;
                    Tok::Newline
                }
                ':' => {
                    self.chars.next();
                    Tok::Colon
                }
                ',' => {
                    self.chars.next();
                    Tok::Comma
                }
                '?' => {
                    self.chars.next();
                    Tok::Question
                }
                '|' => {
                    self.chars.next();
                    Tok::Pipe
                }
                '{' => {
                    self.chars.next();
                    Tok::LBrace
                }
                '}' => {
                    self.chars.next();
                    Tok::RBrace
                }
                '[' => {
                    self.chars.next();
                    Tok::LBracket
                }
                ']' => {
                    self.chars.next();
                    Tok::RBracket
                }
                '(' => {
                    self.chars.next();
                    Tok::LParen
                }
                ')' => {
                    self.chars.next();
                    Tok::RParen
                }
                '-' => self.lex_number(line)?,
                '0'..='9' => self.lex_number(line)?,
                '\'' => self.lex_string(line)?,
                c if c == '_' || c.is_alphabetic() => self.lex_ident_or_keyword(),
                '>' => {
                    // Only valid as part of `->`, handled when we see `-`.
                    return Err(err(format!("unexpected character '{c}'"), line));
                }
                other => {
                    return Err(err(format!("unexpected character '{other}'"), line));
                }
            };
            tokens.push(Token { tok, line });
        }
        Ok(tokens)
    }

    fn skip_spaces_and_comments(&mut self) {
        loop {
            match self.chars.peek() {
                Some(&c) if c == ' ' || c == '\t' || c == '\r' => {
                    self.chars.next();
                }
                Some(&'#') => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_ident_or_keyword(&mut self) -> Tok {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match s.as_str() {
            "true" => Tok::Bool(true),
            "false" => Tok::Bool(false),
            _ => Tok::Ident(s),
        }
    }

    /// Arrow `->` or a signed/float/int number. Floats are tried before
    /// integers: `0.1` lexes as one `Float` token, never `Int(0)`
    /// followed by a stray `.1`.
    fn lex_number(&mut self, line: usize) -> ParseResult<Tok> {
        let mut s = String::new();
        if self.chars.peek() == Some(&'-') {
            // Disambiguate `-` (negative number) from `->` (arrow).
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek() == Some(&'>') {
                self.chars.next();
                self.chars.next();
                return Ok(Tok::Arrow);
            }
            s.push('-');
            self.chars.next();
        }
        let mut saw_digit = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                saw_digit = true;
                self.chars.next();
            } else {
                break;
            }
        }
        if !saw_digit {
            return Err(err("expected digits in numeric literal", line));
        }
        let mut is_float = false;
        if self.chars.peek() == Some(&'.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                s.push('.');
                self.chars.next();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_float {
            s.parse::<f64>()
                .map(Tok::Float)
                .map_err(|_| err(format!("invalid float literal '{s}'"), line))
        } else {
            s.parse::<i64>()
                .map(Tok::Int)
                .map_err(|_| err(format!("invalid integer literal '{s}'"), line))
        }
    }

    fn lex_string(&mut self, line: usize) -> ParseResult<Tok> {
        self.chars.next(); // opening quote
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some('\'') => return Ok(Tok::Str(s)),
                Some('\\') => match self.chars.next() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(c) => s.push(c),
                    None => return Err(err("unterminated string literal", line)),
                },
                Some('\n') => return Err(err("unterminated string literal", line)),
                Some(c) => s.push(c),
                None => return Err(err("unterminated string literal", line)),
            }
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn parse(src: &str) -> ParseResult<SchemaAst> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        parser.parse_schema()
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].tok
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Tok {
        let tok = self.tokens[self.pos].tok.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Tok::Newline) {
            self.advance();
        }
    }

    fn expect(&mut self, expected: &Tok) -> ParseResult<()> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(err(
                format!("expected {expected:?}, found {:?}", self.peek()),
                self.line(),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.advance() {
            Tok::Ident(s) => Ok(s),
            other => Err(err(format!("expected identifier, found {other:?}"), self.line())),
        }
    }

    fn parse_schema(&mut self) -> ParseResult<SchemaAst> {
        let mut ast = SchemaAst::default();
        self.skip_newlines();
        while !matches!(self.peek(), Tok::Eof) {
            if matches!(self.peek(), Tok::Ident(s) if s == "struct") {
                ast.structs.push(self.parse_struct()?);
            } else {
                let name = self.expect_ident()?;
                self.expect(&Tok::Colon)?;
                if matches!(self.peek(), Tok::LParen) {
                    ast.functions.push(self.parse_function_rest(name)?);
                } else {
                    ast.fields.push(self.parse_field_rest(name)?);
                }
            }
            self.end_of_entry()?;
            self.skip_newlines();
        }
        Ok(ast)
    }

    fn end_of_entry(&mut self) -> ParseResult<()> {
        match self.peek() {
            Tok::Newline | Tok::Eof => Ok(()),
            other => Err(err(
                format!("expected end of line, found {other:?}"),
                self.line(),
            )),
        }
    }

    fn parse_struct(&mut self) -> ParseResult<StructDefinition> {
        self.advance(); // 'struct'
        let name = self.expect_ident()?;
        self.skip_newlines();
        self.expect(&Tok::LBrace)?;
        self.skip_newlines();
        let mut fields = Vec::new();
        while !matches!(self.peek(), Tok::RBrace) {
            let fname = self.expect_ident()?;
            self.expect(&Tok::Colon)?;
            fields.push(self.parse_field_rest(fname)?);
            self.skip_newlines();
            if matches!(self.peek(), Tok::Comma) {
                self.advance();
                self.skip_newlines();
            }
        }
        self.expect(&Tok::RBrace)?;
        Ok(StructDefinition { name, fields })
    }

    /// Parses the part of a field declaration after `name ':'`.
    fn parse_field_rest(&mut self, name: String) -> ParseResult<FieldDefinition> {
        let type_expr = self.parse_type_expr()?;
        let optional = if matches!(self.peek(), Tok::Question) {
            self.advance();
            true
        } else {
            false
        };
        let constraints = if matches!(self.peek(), Tok::LBrace) {
            self.parse_constraint_block()?
        } else {
            ConstraintMap::new()
        };
        Ok(FieldDefinition {
            name,
            type_expr,
            optional,
            constraints,
        })
    }

    fn parse_function_rest(&mut self, name: String) -> ParseResult<FunctionSignature> {
        self.expect(&Tok::LParen)?;
        self.skip_newlines();
        let mut params = Vec::new();
        while !matches!(self.peek(), Tok::RParen) {
            let pname = self.expect_ident()?;
            self.expect(&Tok::Colon)?;
            let type_expr = self.parse_type_expr()?;
            let optional = if matches!(self.peek(), Tok::Question) {
                self.advance();
                true
            } else {
                false
            };
            params.push(Parameter {
                name: pname,
                type_expr,
                optional,
            });
            self.skip_newlines();
            if matches!(self.peek(), Tok::Comma) {
                self.advance();
                self.skip_newlines();
            }
        }
        self.expect(&Tok::RParen)?;
        self.skip_newlines();
        self.expect(&Tok::Arrow)?;
        self.skip_newlines();
        let return_type = self.parse_type_expr()?;
        Ok(FunctionSignature {
            name,
            params,
            return_type,
        })
    }

    fn parse_type_expr(&mut self) -> ParseResult<TypeExpr> {
        let name = self.expect_ident()?;
        if name == "List" {
            self.expect(&Tok::LBracket)?;
            let mut members = vec![self.parse_type_expr()?];
            while matches!(self.peek(), Tok::Pipe) {
                self.advance();
                members.push(self.parse_type_expr()?);
            }
            self.expect(&Tok::RBracket)?;
            return Ok(TypeExpr::List(members));
        }
        if let Some(p) = Primitive::parse(&name) {
            return Ok(TypeExpr::Primitive(p));
        }
        Ok(TypeExpr::Named(name))
    }

    fn parse_constraint_block(&mut self) -> ParseResult<ConstraintMap> {
        self.advance(); // '{'
        let mut map = ConstraintMap::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), Tok::RBrace) {
                break;
            }
            let key = self.expect_ident()?;
            self.expect(&Tok::Colon)?;
            let value = self.parse_constraint_value()?;
            map.insert(key, value);
            self.skip_newlines();
            if matches!(self.peek(), Tok::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.skip_newlines();
        self.expect(&Tok::RBrace)?;
        Ok(map)
    }

    fn parse_constraint_value(&mut self) -> ParseResult<ConstraintValue> {
        match self.advance() {
            Tok::Int(i) => Ok(ConstraintValue::Int(i)),
            Tok::Float(f) => Ok(ConstraintValue::Float(f)),
            Tok::Bool(b) => Ok(ConstraintValue::Bool(b)),
            Tok::Str(s) => Ok(ConstraintValue::Str(s)),
            Tok::LBracket => {
                let mut items = Vec::new();
                while !matches!(self.peek(), Tok::RBracket) {
                    items.push(self.parse_constraint_value()?);
                    if matches!(self.peek(), Tok::Comma) {
                        self.advance();
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(ConstraintValue::List(items))
            }
            other => Err(err(
                format!("expected constraint value, found {other:?}"),
                self.line(),
            )),
        }
    }
}
