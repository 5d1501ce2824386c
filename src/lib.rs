//! rules-engine: a schema-first classification rules engine
//!
//! A caller declares a decision's shape once (the schema), compiles a
//! set of boolean rule expressions against it, and evaluates decisions
//! through the compiled set. Schema and decision validation never
//! coerce types; the evaluator never lets one bad rule fail a batch.

pub mod compiler;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod operators;
pub mod rule;
pub mod schema;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use engine::{Engine, EngineOptions, RuleSpec};
pub use error::EngineError;
pub use matcher::{MatchConfig, MatchResult};
pub use schema::SchemaRegistry;
pub use value::{Value, ValueMap};
