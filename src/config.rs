//! Configuration primitives for the enrichment pipeline.
//!
//! Stored in a machine-readable TOML file located under the workspace root:
//!   `$CLIENTBASE_HOME/config/config.toml` when the variable is set, otherwise
//!   the OS data directory (`directories::BaseDirs`) joined with `ClientBase`.

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Nudge selection and apply tuning.
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
}

/// Knobs for scoring, nudging, proposal building and apply sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    /// Upper bound on follow-up questions shown after one interaction.
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    /// Share of the empty fields worth asking about.
    #[serde(default = "default_nudge_ratio")]
    pub nudge_ratio: f64,
    /// Characters of raw input kept when the note falls back to truncation.
    #[serde(default = "default_note_fallback_chars")]
    pub note_fallback_chars: usize,
    /// Concurrent artifact/interest bookkeeping calls during apply (1 = sequential).
    #[serde(default = "default_sweep_concurrency")]
    pub sweep_concurrency: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            max_questions: default_max_questions(),
            nudge_ratio: default_nudge_ratio(),
            note_fallback_chars: default_note_fallback_chars(),
            sweep_concurrency: default_sweep_concurrency(),
        }
    }
}

const fn default_max_questions() -> usize {
    10
}

const fn default_nudge_ratio() -> f64 {
    0.2
}

const fn default_note_fallback_chars() -> usize {
    280
}

const fn default_sweep_concurrency() -> usize {
    1
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the root directory where ClientBase stores data.
///
/// Order of precedence:
/// 1. `CLIENTBASE_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("CLIENTBASE_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("ClientBase"))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("config"))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    load_from(&config_file_path()?)
}

pub fn load_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let cfg: AppConfig =
        toml::from_str(&data).with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(cfg)
}

pub fn save_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = toml::to_string_pretty(config)?;
    fs::write(path, data).with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}
