//! Configuration file loading
//!
//! `EngineConfig` captures the options `engine::EngineOptions` needs
//! (rules mode, decisions mode, operator preset) so a CLI or service
//! caller can point at a TOML file instead of constructing
//! `EngineOptions` by hand. This is an alternate entry point alongside
//! `Engine::load_schema` — it does not replace it.

use crate::compiler::RulesMode;
use crate::decision::DecisionsMode;
use crate::operators::Preset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level configuration file shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Path to the schema source (file path or, if absent, expected on
    /// the CLI invocation itself).
    #[serde(default)]
    pub schema: Option<std::path::PathBuf>,

    /// Path to a file of rule expressions the CLI binary loads.
    #[serde(default)]
    pub rules: Option<std::path::PathBuf>,

    /// `"strict"` or `"loose"` — compiler-level operand type checking.
    #[serde(default = "default_rules_mode")]
    pub rules_mode: String,

    /// `"strict"` or `"loose"` — decision validator behavior.
    #[serde(default = "default_decisions_mode")]
    pub decisions_mode: String,

    /// `"standard"`, `"minimal"`, or an explicit token list.
    #[serde(default = "default_operators")]
    pub operators: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema: None,
            rules: None,
            rules_mode: default_rules_mode(),
            decisions_mode: default_decisions_mode(),
            operators: default_operators(),
        }
    }
}

fn default_rules_mode() -> String {
    "strict".to_string()
}

fn default_decisions_mode() -> String {
    "loose".to_string()
}

fn default_operators() -> String {
    "standard".to_string()
}

impl EngineConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the `rules_mode` string into the typed enum the engine
    /// expects.
    pub fn rules_mode(&self) -> Result<RulesMode, ConfigError> {
        match self.rules_mode.as_str() {
            "strict" => Ok(RulesMode::Strict),
            "loose" => Ok(RulesMode::Loose),
            other => Err(ConfigError::Validation(format!(
                "invalid rules_mode '{other}'. Valid values: strict, loose"
            ))),
        }
    }

    /// Resolve the `decisions_mode` string into the typed enum.
    pub fn decisions_mode(&self) -> Result<DecisionsMode, ConfigError> {
        match self.decisions_mode.as_str() {
            "strict" => Ok(DecisionsMode::Strict),
            "loose" => Ok(DecisionsMode::Loose),
            other => Err(ConfigError::Validation(format!(
                "invalid decisions_mode '{other}'. Valid values: strict, loose"
            ))),
        }
    }

    /// Resolve the `operators` string into a `Preset`. An explicit
    /// token list (anything not `"standard"`/`"minimal"`) falls back to
    /// `Preset::Standard` here — the CLI layers caller-registered
    /// operators on top rather than parsing a token list from TOML.
    pub fn operators_preset(&self) -> Preset {
        Preset::parse(&self.operators).unwrap_or(Preset::Standard)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.rules_mode()?;
        self.decisions_mode()?;
        Ok(())
    }
}
