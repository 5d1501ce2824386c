//! Schema registry
//!
//! Built from a validated `SchemaAst`. Indexes every dotted path
//! reachable through struct composition so `get_field` is O(1), and can
//! re-serialize the AST back to schema text for `export_schema`.

use crate::schema::ast::{ConstraintValue, FieldDefinition, SchemaAst, TypeExpr};
use std::collections::HashMap;
use std::fmt::Write as _;

pub struct SchemaRegistry {
    ast: SchemaAst,
    custom_type_names: Vec<String>,
    /// Dotted path ("addr.city") to the terminal field definition,
    /// indexed once at construction.
    field_index: HashMap<String, FieldDefinition>,
}

impl SchemaRegistry {
    /// `ast` must already have passed `schema::validator::validate`.
    /// `custom_type_names` is the set of registered custom type names at
    /// the time the registry is built (frozen afterwards, same as every
    /// other registry).
    pub fn new(ast: SchemaAst, custom_type_names: Vec<String>) -> Self {
        let mut field_index = HashMap::new();
        for field in &ast.fields {
            index_field(&ast, field.name.clone(), field, &mut field_index);
        }
        Self {
            ast,
            custom_type_names,
            field_index,
        }
    }

    /// Traverses `a.b.c` through struct fields; returns `None` if any
    /// segment doesn't resolve.
    pub fn get_field(&self, dotted_path: &str) -> Option<&FieldDefinition> {
        self.field_index.get(dotted_path)
    }

    pub fn ast(&self) -> &SchemaAst {
        &self.ast
    }

    /// Union of primitives, struct names, and registered custom types.
    pub fn known_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec!["Int", "Float", "Str", "Bool"]
            .into_iter()
            .map(String::from)
            .collect();
        names.extend(self.ast.structs.iter().map(|s| s.name.clone()));
        names.extend(self.custom_type_names.iter().cloned());
        names
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.ast.struct_def(name).is_some()
    }

    /// Serializes the AST back to schema text. Reproduces enough
    /// structure — types, `?` suffixes, constraints, structs, function
    /// signatures — that a fresh parse of the output yields a
    /// semantically equal AST (spec.md §8's round-trip law).
    pub fn export_schema(&self) -> String {
        let mut out = String::new();
        for field in &self.ast.fields {
            write_field_line(&mut out, field);
        }
        for s in &self.ast.structs {
            let _ = writeln!(out, "struct {} {{", s.name);
            for field in &s.fields {
                out.push_str("  ");
                write_field_line(&mut out, field);
            }
            out.push_str("}\n");
        }
        for f in &self.ast.functions {
            let params: Vec<String> = f
                .params
                .iter()
                .map(|p| {
                    format!(
                        "{}: {}{}",
                        p.name,
                        type_expr_to_string(&p.type_expr),
                        if p.optional { "?" } else { "" }
                    )
                })
                .collect();
            let _ = writeln!(
                out,
                "{}: ({}) -> {}",
                f.name,
                params.join(", "),
                type_expr_to_string(&f.return_type)
            );
        }
        out
    }
}

fn write_field_line(out: &mut String, field: &FieldDefinition) {
    let _ = write!(out, "{}: {}", field.name, type_expr_to_string(&field.type_expr));
    if field.optional {
        out.push('?');
    }
    if !field.constraints.is_empty() {
        out.push_str(" {");
        let parts: Vec<String> = field
            .constraints
            .iter()
            .map(|(k, v)| format!("{}: {}", k, constraint_value_to_string(v)))
            .collect();
        out.push_str(&parts.join(", "));
        out.push('}');
    }
    out.push('\n');
}

fn type_expr_to_string(type_expr: &TypeExpr) -> String {
    match type_expr {
        TypeExpr::Primitive(p) => p.name().to_string(),
        TypeExpr::List(members) => {
            let parts: Vec<String> = members.iter().map(type_expr_to_string).collect();
            format!("List[{}]", parts.join("|"))
        }
        TypeExpr::Named(name) => name.clone(),
    }
}

fn constraint_value_to_string(value: &ConstraintValue) -> String {
    match value {
        ConstraintValue::Int(i) => i.to_string(),
        ConstraintValue::Float(f) => f.to_string(),
        ConstraintValue::Bool(b) => b.to_string(),
        ConstraintValue::Str(s) => format!("'{s}'"),
        ConstraintValue::List(items) => {
            let parts: Vec<String> = items.iter().map(constraint_value_to_string).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}

fn index_field(
    ast: &SchemaAst,
    path: String,
    field: &FieldDefinition,
    out: &mut HashMap<String, FieldDefinition>,
) {
    out.insert(path.clone(), field.clone());
    if let TypeExpr::Named(name) = &field.type_expr {
        if let Some(def) = ast.struct_def(name) {
            for nested in &def.fields {
                index_field(ast, format!("{path}.{}", nested.name), nested, out);
            }
        }
    }
}
