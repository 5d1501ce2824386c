//! Rule expression tokenizer
//!
//! Whitespace-insensitive. Symbolic operator tokens are matched
//! greedily, longest-first, against the union of the fixed structural
//! set (`( ) [ ] , . >= <= != > < =`) and whatever symbol tokens are
//! currently registered in the operator registry — this is what makes
//! the tokenizer follow a *dynamic* operator table rather than a fixed
//! grammar.

use crate::error::{ErrorContext, RuleParseError};

#[derive(Debug, Clone, PartialEq)]
pub enum RTok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Symbol(String),
    Eof,
}

fn err(message: impl Into<String>) -> RuleParseError {
    RuleParseError {
        message: message.into(),
        context: ErrorContext::new(),
    }
}

/// Tokenizes `src`. `extra_symbols` are symbol-kind operator tokens
/// registered beyond the fixed comparison set (e.g. a custom `=~`
/// operator) — passed in by the parser from the live operator registry.
pub fn tokenize(src: &str, extra_symbols: &[String]) -> Result<Vec<RTok>, RuleParseError> {
    let mut symbols: Vec<&str> = vec![">=", "<=", "!=", "=", ">", "<"];
    for s in extra_symbols {
        if !symbols.contains(&s.as_str()) {
            symbols.push(s.as_str());
        }
    }
    symbols.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(RTok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(RTok::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(RTok::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(RTok::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(RTok::Comma);
                i += 1;
            }
            '.' => {
                // A '.' between two digits is a decimal point, handled
                // inside number lexing; a bare '.' here is a path
                // separator.
                tokens.push(RTok::Dot);
                i += 1;
            }
            '\'' => {
                let (s, consumed) = lex_string(&chars[i..])?;
                tokens.push(RTok::Str(s));
                i += consumed;
            }
            '0'..='9' => {
                let (tok, consumed) = lex_number(&chars[i..])?;
                tokens.push(tok);
                i += consumed;
            }
            c if c == '_' || c.is_alphabetic() => {
                let (s, consumed) = lex_ident(&chars[i..]);
                i += consumed;
                tokens.push(match s.as_str() {
                    "true" => RTok::Bool(true),
                    "false" => RTok::Bool(false),
                    _ => RTok::Ident(s),
                });
            }
            _ => {
                let remainder: String = chars[i..].iter().collect();
                if let Some(sym) = symbols.iter().find(|s| remainder.starts_with(**s)) {
                    tokens.push(RTok::Symbol(sym.to_string()));
                    i += sym.chars().count();
                } else {
                    return Err(err(format!("unexpected character '{c}'")));
                }
            }
        }
    }
    tokens.push(RTok::Eof);
    Ok(tokens)
}

fn lex_ident(chars: &[char]) -> (String, usize) {
    let mut s = String::new();
    let mut n = 0;
    for &c in chars {
        if c.is_alphanumeric() || c == '_' {
            s.push(c);
            n += 1;
        } else {
            break;
        }
    }
    (s, n)
}

/// Float-before-int: `600.0` lexes as `Float`, `600` as `Int`.
fn lex_number(chars: &[char]) -> Result<(RTok, usize), RuleParseError> {
    let mut n = 0;
    let mut s = String::new();
    while n < chars.len() && chars[n].is_ascii_digit() {
        s.push(chars[n]);
        n += 1;
    }
    let mut is_float = false;
    if n < chars.len() && chars[n] == '.' && n + 1 < chars.len() && chars[n + 1].is_ascii_digit() {
        is_float = true;
        s.push('.');
        n += 1;
        while n < chars.len() && chars[n].is_ascii_digit() {
            s.push(chars[n]);
            n += 1;
        }
    }
    if is_float {
        s.parse::<f64>()
            .map(|f| (RTok::Float(f), n))
            .map_err(|_| err(format!("invalid float literal '{s}'")))
    } else {
        s.parse::<i64>()
            .map(|i| (RTok::Int(i), n))
            .map_err(|_| err(format!("invalid integer literal '{s}'")))
    }
}

fn lex_string(chars: &[char]) -> Result<(String, usize), RuleParseError> {
    let mut n = 1; // skip opening quote
    let mut s = String::new();
    loop {
        if n >= chars.len() {
            return Err(err("unterminated string literal"));
        }
        match chars[n] {
            '\'' => return Ok((s, n + 1)),
            '\\' if n + 1 < chars.len() => {
                match chars[n + 1] {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => s.push(other),
                }
                n += 2;
            }
            c => {
                s.push(c);
                n += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_invariant_token_stream() {
        let a = tokenize("credit_score<600", &[]).unwrap();
        let b = tokenize("credit_score  <  600", &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn float_before_int() {
        let toks = tokenize("600.0 600", &[]).unwrap();
        assert_eq!(toks[0], RTok::Float(600.0));
        assert_eq!(toks[1], RTok::Int(600));
    }

    #[test]
    fn greedy_longest_symbol_match() {
        let toks = tokenize(">= > != =", &[]).unwrap();
        assert_eq!(
            toks,
            vec![
                RTok::Symbol(">=".into()),
                RTok::Symbol(">".into()),
                RTok::Symbol("!=".into()),
                RTok::Symbol("=".into()),
                RTok::Eof,
            ]
        );
    }

    #[test]
    fn not_in_tokenizes_as_two_idents() {
        // Combined into one logical token by the parser, not the lexer.
        let toks = tokenize("x not in y", &[]).unwrap();
        assert_eq!(
            toks,
            vec![
                RTok::Ident("x".into()),
                RTok::Ident("not".into()),
                RTok::Ident("in".into()),
                RTok::Ident("y".into()),
                RTok::Eof,
            ]
        );
    }

    #[test]
    fn dotted_path_tokens() {
        let toks = tokenize("addr.city", &[]).unwrap();
        assert_eq!(
            toks,
            vec![
                RTok::Ident("addr".into()),
                RTok::Dot,
                RTok::Ident("city".into()),
                RTok::Eof,
            ]
        );
    }

    #[test]
    fn custom_symbol_is_recognized_when_passed_in() {
        let toks = tokenize("a =~ b", &["=~".to_string()]).unwrap();
        assert_eq!(toks[1], RTok::Symbol("=~".into()));
    }

    #[test]
    fn string_literal_with_escape() {
        let toks = tokenize(r"'a\'b'", &[]).unwrap();
        assert_eq!(toks[0], RTok::Str("a'b".into()));
    }
}
