//! Run configuration module.
//!
//! Handles loading, validating, and merging `typedrop.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is deep-merged on top,
//! so a config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `typedrop.toml` lives in the site root next to `index.html` and
//! `challenges.json`. A different file can be passed with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [generator]
//! model = "claude-sonnet-4-6"
//! api_url = "https://api.anthropic.com/v1/messages"
//! max_tokens = 8192
//! temperature = 0.8
//! max_attempts = 3          # Generation attempts before the run fails
//! backoff_secs = 2          # Delay before retry N is backoff_secs * N
//! history_len = 5           # Recent challenges summarized in the prompt
//! timezone = "utc"          # "utc" or "local": which calendar day is "today"
//!
//! [site]
//! name = "TypeDrop"
//! repo_owner = "niltonheck"
//! repo_name = "typedrop"
//! # analytics_endpoint = "https://example.goatcounter.com/count"
//!
//! [paths]
//! store = "challenges.json"
//! index = "index.html"
//! archive = "archive.html"
//! archive_dir = "archive"
//! bundle_dir = "challenge-output"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the config file looked up in the site root.
pub const CONFIG_FILENAME: &str = "typedrop.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `typedrop.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Generative service and retry settings.
    pub generator: GeneratorConfig,
    /// Site identity used in page chrome and call-to-action links.
    pub site: SiteInfo,
    /// Blob keys, relative to the site root.
    pub paths: PathsConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generator;
        if g.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "generator.max_attempts must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&g.temperature) {
            return Err(ConfigError::Validation(
                "generator.temperature must be 0.0-1.0".into(),
            ));
        }
        if g.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "generator.max_tokens must be non-zero".into(),
            ));
        }
        if g.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "generator.model must not be empty".into(),
            ));
        }
        if self.site.repo_owner.trim().is_empty() || self.site.repo_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site.repo_owner and site.repo_name must not be empty".into(),
            ));
        }
        for (key, value) in self.paths.entries() {
            if !is_relative_key(value) {
                return Err(ConfigError::Validation(format!(
                    "paths.{key} must be a relative path inside the site root, got {value:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Which clock decides the calendar day stamped on a new record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    #[default]
    Utc,
    Local,
}

impl Timezone {
    /// Today's date in this timezone.
    pub fn today(self) -> chrono::NaiveDate {
        match self {
            Timezone::Utc => chrono::Utc::now().date_naive(),
            Timezone::Local => chrono::Local::now().date_naive(),
        }
    }
}

/// Generative service and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub model: String,
    pub api_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Linear backoff unit: retry `n` waits `backoff_secs * n`.
    pub backoff_secs: u64,
    /// How many recent challenges are summarized in the request.
    pub history_len: usize,
    pub timezone: Timezone,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-6".to_string(),
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            max_tokens: 8192,
            temperature: 0.8,
            max_attempts: 3,
            backoff_secs: 2,
            history_len: 5,
            timezone: Timezone::Utc,
        }
    }
}

/// Site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    /// Shown in page titles and the header.
    pub name: String,
    /// GitHub owner hosting the per-day `challenge/<date>` branches.
    pub repo_owner: String,
    pub repo_name: String,
    /// Analytics counter endpoint. No tracking script is emitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_endpoint: Option<String>,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: "TypeDrop".to_string(),
            repo_owner: "niltonheck".to_string(),
            repo_name: "typedrop".to_string(),
            analytics_endpoint: None,
        }
    }
}

/// Blob keys for everything the pipeline reads or writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub store: String,
    pub index: String,
    pub archive: String,
    pub archive_dir: String,
    pub bundle_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            store: "challenges.json".to_string(),
            index: "index.html".to_string(),
            archive: "archive.html".to_string(),
            archive_dir: "archive".to_string(),
            bundle_dir: "challenge-output".to_string(),
        }
    }
}

impl PathsConfig {
    fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("store", self.store.as_str()),
            ("index", self.index.as_str()),
            ("archive", self.archive.as_str()),
            ("archive_dir", self.archive_dir.as_str()),
            ("bundle_dir", self.bundle_dir.as_str()),
        ]
    }
}

fn is_relative_key(value: &str) -> bool {
    let path = Path::new(value);
    !value.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit file path. A missing file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Load `typedrop.toml` from the given site root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_file(&root.join(CONFIG_FILENAME))
}

/// Returns a fully-commented stock `typedrop.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# TypeDrop Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Challenge generation
# ---------------------------------------------------------------------------
[generator]
# Model used for generation.
model = "claude-sonnet-4-6"

# Messages API endpoint. The key is read from ANTHROPIC_API_KEY.
api_url = "https://api.anthropic.com/v1/messages"

max_tokens = 8192

# Sampling temperature (0.0 - 1.0).
temperature = 0.8

# Attempts before the run fails. Retry N waits backoff_secs * N seconds.
max_attempts = 3
backoff_secs = 2

# Recent challenges summarized in the prompt to steer away from repeats.
history_len = 5

# Which calendar day is "today": "utc" or "local".
timezone = "utc"

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
[site]
name = "TypeDrop"

# Repository holding the per-day challenge/<date> branches. Used for the
# StackBlitz, CodeSandbox and git clone links on every card.
repo_owner = "niltonheck"
repo_name = "typedrop"

# Analytics counter endpoint. Omit to publish pages without a tracking script.
# analytics_endpoint = "https://example.goatcounter.com/count"

# ---------------------------------------------------------------------------
# Paths (relative to the site root)
# ---------------------------------------------------------------------------
[paths]
store = "challenges.json"
index = "index.html"
archive = "archive.html"
archive_dir = "archive"
bundle_dir = "challenge-output"
"##
}
