//! Schema validator
//!
//! Checks a parsed `SchemaAst` for self-consistency: duplicate names,
//! unresolved type references, and cyclic struct references. Does not
//! touch the operator or rule layers.

use crate::error::{ErrorContext, SchemaValidationError};
use crate::schema::ast::{SchemaAst, TypeExpr};
use std::collections::HashSet;

type ValidateResult<T> = Result<T, SchemaValidationError>;

fn err(message: impl Into<String>) -> SchemaValidationError {
    SchemaValidationError {
        message: message.into(),
        context: ErrorContext::new(),
    }
}

/// Validates `ast` against the given set of already-registered custom
/// type names (built-ins plus anything added via `register_type` before
/// the schema registry is built).
pub fn validate(ast: &SchemaAst, known_custom_types: &HashSet<String>) -> ValidateResult<()> {
    check_duplicate_top_level_names(ast)?;
    check_duplicate_struct_fields(ast)?;
    check_type_references_resolve(ast, known_custom_types)?;
    check_struct_reference_cycles(ast)?;
    Ok(())
}

fn check_duplicate_top_level_names(ast: &SchemaAst) -> ValidateResult<()> {
    let mut seen = HashSet::new();
    for name in ast
        .fields
        .iter()
        .map(|f| &f.name)
        .chain(ast.structs.iter().map(|s| &s.name))
        .chain(ast.functions.iter().map(|f| &f.name))
    {
        if !seen.insert(name.clone()) {
            return Err(err(format!("duplicate top-level name '{name}'"))
                .with_field(name));
        }
    }
    Ok(())
}

fn check_duplicate_struct_fields(ast: &SchemaAst) -> ValidateResult<()> {
    for s in &ast.structs {
        let mut seen = HashSet::new();
        for field in &s.fields {
            if !seen.insert(&field.name) {
                return Err(err(format!(
                    "struct '{}' has duplicate field '{}'",
                    s.name, field.name
                ))
                .with_field(&field.name));
            }
        }
    }
    Ok(())
}

fn is_resolvable(type_expr: &TypeExpr, ast: &SchemaAst, known_custom_types: &HashSet<String>) -> bool {
    match type_expr {
        TypeExpr::Primitive(_) => true,
        TypeExpr::List(members) => members
            .iter()
            .all(|m| is_resolvable(m, ast, known_custom_types)),
        TypeExpr::Named(name) => {
            ast.struct_def(name).is_some() || known_custom_types.contains(name)
        }
    }
}

fn check_type_references_resolve(
    ast: &SchemaAst,
    known_custom_types: &HashSet<String>,
) -> ValidateResult<()> {
    for field in &ast.fields {
        if !is_resolvable(&field.type_expr, ast, known_custom_types) {
            return Err(err(format!(
                "field '{}' references unknown type '{}'",
                field.name,
                field.type_expr.type_name()
            ))
            .with_field(&field.name));
        }
    }
    for s in &ast.structs {
        for field in &s.fields {
            if !is_resolvable(&field.type_expr, ast, known_custom_types) {
                return Err(err(format!(
                    "field '{}.{}' references unknown type '{}'",
                    s.name,
                    field.name,
                    field.type_expr.type_name()
                ))
                .with_field(format!("{}.{}", s.name, field.name)));
            }
        }
    }
    for f in &ast.functions {
        for p in &f.params {
            if !is_resolvable(&p.type_expr, ast, known_custom_types) {
                return Err(err(format!(
                    "parameter '{}' of function '{}' references unknown type '{}'",
                    p.name,
                    f.name,
                    p.type_expr.type_name()
                ))
                .with_field(&p.name));
            }
        }
        if !is_resolvable(&f.return_type, ast, known_custom_types) {
            return Err(err(format!(
                "return type of function '{}' references unknown type '{}'",
                f.name,
                f.return_type.type_name()
            ))
            .with_field(&f.name));
        }
    }
    Ok(())
}

/// Struct names referenced by a type expression (ignores primitives and
/// custom types, which cannot participate in the cycle since they carry
/// no fields of their own).
fn struct_refs<'a>(type_expr: &'a TypeExpr, ast: &'a SchemaAst, out: &mut Vec<&'a str>) {
    match type_expr {
        TypeExpr::Primitive(_) => {}
        TypeExpr::List(members) => {
            for m in members {
                struct_refs(m, ast, out);
            }
        }
        TypeExpr::Named(name) => {
            if ast.struct_def(name).is_some() {
                out.push(name.as_str());
            }
        }
    }
}

fn check_struct_reference_cycles(ast: &SchemaAst) -> ValidateResult<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Visiting,
        Done,
    }
    use std::collections::HashMap;

    fn visit<'a>(
        name: &'a str,
        ast: &'a SchemaAst,
        state: &mut HashMap<&'a str, State>,
    ) -> ValidateResult<()> {
        match state.get(name) {
            Some(State::Visiting) => {
                return Err(err(format!(
                    "circular struct reference involving '{name}'"
                ))
                .with_field(name));
            }
            Some(State::Done) => return Ok(()),
            None => {}
        }
        state.insert(name, State::Visiting);
        if let Some(def) = ast.struct_def(name) {
            for field in &def.fields {
                let mut refs = Vec::new();
                struct_refs(&field.type_expr, ast, &mut refs);
                for r in refs {
                    visit(r, ast, state)?;
                }
            }
        }
        state.insert(name, State::Done);
        Ok(())
    }

    let mut state = HashMap::new();
    for s in &ast.structs {
        visit(&s.name, ast, &mut state)?;
    }
    Ok(())
}

trait WithField {
    fn with_field(self, field: impl Into<String>) -> Self;
}

impl WithField for SchemaValidationError {
    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context = self.context.field(field);
        self
    }
}
