//=====================================================
// File: config/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime configuration for ChronoScript
// Objective: Ledger budgets, temporal operation costs and interpreter
//            limits, loaded from TOML with defaults for every field
//=====================================================

//! Configuration handling for the ChronoScript runtime including loading and defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration file name inside the user's config directory.
const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR: &str = "chronoscript";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Resource budgets and temporal operation costs for the ledger.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub initial_aethel: f64,
    pub initial_chronons: f64,
    /// Paradox level above which a warning is emitted.
    pub paradox_high_water: u32,
    pub snapshot_chronon_cost: f64,
    pub snapshot_paradox: u32,
    pub rewind_aethel_cost: f64,
    pub rewind_paradox: u32,
    pub merge_aethel_cost: f64,
    pub merge_chronon_cost: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_aethel: 100.0,
            initial_chronons: 1000.0,
            paradox_high_water: 50,
            snapshot_chronon_cost: 5.0,
            snapshot_paradox: 1,
            rewind_aethel_cost: 10.0,
            rewind_paradox: 3,
            merge_aethel_cost: 10.0,
            merge_chronon_cost: 5.0,
        }
    }
}

/// Evaluation limits and per-operation paradox accounting.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Paradox added when an arithmetic operator mixes CONF and REB operands.
    pub arithmetic_paradox: u32,
    /// Paradox added when any other binary operator mixes modifiers.
    pub mixed_paradox: u32,
    pub chronons_per_iteration: f64,
    pub max_loop_iterations: usize,
    /// Nesting depth of evaluation before a fatal error.
    pub max_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            arithmetic_paradox: 2,
            mixed_paradox: 1,
            chronons_per_iteration: 1.0,
            max_loop_iterations: 10_000,
            max_depth: 512,
        }
    }
}

/// Configuration model for the runtime loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub ledger: LedgerConfig,
    pub interpreter: InterpreterConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// `<config dir>/chronoscript/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ledger = &self.ledger;
        let amounts = [
            ("ledger.initial_aethel", ledger.initial_aethel),
            ("ledger.initial_chronons", ledger.initial_chronons),
            ("ledger.snapshot_chronon_cost", ledger.snapshot_chronon_cost),
            ("ledger.rewind_aethel_cost", ledger.rewind_aethel_cost),
            ("ledger.merge_aethel_cost", ledger.merge_aethel_cost),
            ("ledger.merge_chronon_cost", ledger.merge_chronon_cost),
            (
                "interpreter.chronons_per_iteration",
                self.interpreter.chronons_per_iteration,
            ),
        ];
        for (field, amount) in amounts {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a non-negative number, got {amount}"
                )));
            }
        }
        if self.interpreter.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "interpreter.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}


//=====================================================
// End of file
//=====================================================
