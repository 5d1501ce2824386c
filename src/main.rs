//! rules-engine CLI
//!
//! Loads a schema and a rules file, reads one decision as JSON from
//! stdin, and prints the match result as JSON. Intentionally thin —
//! no example scripts, no persistence, no networking (spec.md §1
//! Non-goals).

use anyhow::{Context, Result};
use clap::Parser;
use rules_engine::config::EngineConfig;
use rules_engine::engine::{Engine, EngineOptions, RuleSpec};
use rules_engine::value::{Value, ValueMap};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read as _;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rules-engine")]
#[command(about = "Schema-first classification rules engine", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "rules-engine.toml")]
    config: PathBuf,

    /// Path to the schema file (overrides the config file's `schema`)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Path to the rules file (overrides the config file's `rules`)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Explain a configuration section (e.g. "rules_mode") or "all"
    #[arg(long)]
    explain_config: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleFileEntry {
    id: String,
    rule: String,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(section) = args.explain_config {
        return explain_config(&section);
    }

    let config = if args.config.exists() {
        EngineConfig::from_file(&args.config).context("failed to load configuration")?
    } else {
        eprintln!(
            "Warning: config file {} not found, using defaults",
            args.config.display()
        );
        EngineConfig::default()
    };

    let schema_path = args
        .schema
        .or(config.schema.clone())
        .context("no schema path given (pass --schema or set `schema` in the config file)")?;
    let rules_path = args
        .rules
        .or(config.rules.clone())
        .context("no rules path given (pass --rules or set `rules` in the config file)")?;

    let schema_text =
        std::fs::read_to_string(&schema_path).context("failed to read schema file")?;
    let options = EngineOptions {
        rules_mode: config.rules_mode()?,
        decisions_mode: config.decisions_mode()?,
        operators: config.operators_preset(),
        ..EngineOptions::default()
    };
    let engine = Engine::load_schema(&schema_text, options).context("failed to load schema")?;

    let rules_text = std::fs::read_to_string(&rules_path).context("failed to read rules file")?;
    let entries: Vec<RuleFileEntry> =
        serde_json::from_str(&rules_text).context("failed to parse rules file as JSON")?;
    let rules: Vec<RuleSpec> = entries
        .into_iter()
        .map(|e| RuleSpec {
            id: e.id,
            rule: e.rule,
            metadata: e
                .metadata
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        })
        .collect();

    let mut stdin_text = String::new();
    std::io::stdin()
        .read_to_string(&mut stdin_text)
        .context("failed to read decision from stdin")?;
    let decision_json: serde_json::Value =
        serde_json::from_str(&stdin_text).context("failed to parse decision as JSON")?;
    let decision = json_to_value_map(decision_json)?;

    let result = engine
        .eval(&rules, &decision, None)
        .context("evaluation failed")?;

    let output = serde_json::json!({
        "id": result.id,
        "matched": result.matched,
        "excluded": result.excluded,
        "score": result.score,
        "warnings": result.warnings,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn explain_config(section: &str) -> Result<()> {
    let sections: &[(&str, &str)] = &[
        ("schema", "Path to the schema source file."),
        ("rules", "Path to a JSON file of {id, rule, metadata} entries."),
        (
            "rules_mode",
            "\"strict\" (default) or \"loose\" — compiler-level operand type checking.",
        ),
        (
            "decisions_mode",
            "\"strict\" or \"loose\" (default) — decision validator behavior.",
        ),
        (
            "operators",
            "\"standard\" (default) or \"minimal\" operator preset.",
        ),
    ];

    if section == "all" {
        for (name, text) in sections {
            println!("{name}: {text}");
        }
    } else if let Some((_, text)) = sections.iter().find(|(name, _)| *name == section) {
        println!("{text}");
    } else {
        anyhow::bail!("unknown config section '{section}'");
    }

    Ok(())
}

/// Converts a parsed JSON document into a decision's `ValueMap`.
/// Intentionally narrow: the top level must be a JSON object, matching
/// a decision's shape (spec.md §3).
fn json_to_value_map(json: serde_json::Value) -> Result<ValueMap> {
    match json {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, json_to_value(v)))
            .collect()),
        other => anyhow::bail!("decision must be a JSON object, got {other}"),
    }
}

/// Converts one JSON value into the engine's dynamic `Value`. JSON has
/// no `Int`/`Float` distinction; an integral JSON number becomes
/// `Value::Int`, anything else numeric becomes `Value::Float`.
fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            Value::Struct(map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}
