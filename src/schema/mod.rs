//! Schema language: AST, parser, validator, and registry.

pub mod ast;
pub mod parser;
pub mod registry;
pub mod validator;

pub use ast::{
    ConstraintMap, ConstraintValue, FieldDefinition, FunctionSignature, Parameter, Primitive,
    SchemaAst, StructDefinition, TypeExpr,
};
pub use registry::SchemaRegistry;

use crate::error::EngineError;
use std::collections::HashSet;

/// Parses, validates, and indexes schema text in one call — the path
/// the engine façade (`engine::Engine::load_schema`) takes.
pub fn build_registry(
    src: &str,
    known_custom_types: &HashSet<String>,
) -> Result<SchemaRegistry, EngineError> {
    let ast = parser::Parser::parse(src)?;
    validator::validate(&ast, known_custom_types)?;
    let custom_type_names: Vec<String> = known_custom_types.iter().cloned().collect();
    Ok(SchemaRegistry::new(ast, custom_type_names))
}
