//! Service configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to override.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [dataset]
//! path = "dataset/nov19.csv"
//!
//! [images]
//! dir = "images"              # Generated and copied images live here
//! mount = "/images"           # URL prefix the directory is served under
//! fallback = "placeholder"    # "placeholder" or "none"
//! placeholder_url = "https://source.unsplash.com/400x400/?{query},food"
//!
//! [generator]
//! enabled = true              # Also requires OPENAI_API_KEY in the environment
//! api_base = "https://api.openai.com/v1"
//! model = "dall-e-2"
//! size = "256x256"
//! prompt = "A delicious, appetizing photo of {food} with a small wiscosin madison badge"
//! timeout_secs = 60
//!
//! [processing]
//! max_workers = 4             # Parallel generator calls (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The generator API key is never read from the file. It comes from the
//! `OPENAI_API_KEY` environment variable, see [`api_key_from_env`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable holding the image generator API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Location of the food dataset.
    pub dataset: DatasetConfig,
    /// Images directory, URL mount and fallback policy.
    pub images: ImagesConfig,
    /// Image generator settings.
    pub generator: GeneratorConfig,
    /// Parallel generation settings.
    pub processing: ProcessingConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.images.mount.starts_with('/') || self.images.mount.ends_with('/') {
            return Err(ConfigError::Validation(
                "images.mount must start with '/' and must not end with '/'".into(),
            ));
        }
        if !self.images.placeholder_url.contains("{query}") {
            return Err(ConfigError::Validation(
                "images.placeholder_url must contain {query}".into(),
            ));
        }
        if !self.generator.prompt.contains("{food}") {
            return Err(ConfigError::Validation(
                "generator.prompt must contain {food}".into(),
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "generator.timeout_secs must be non-zero".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// CSV file with `name`, `diningHall`, `calories`, `image_path` columns.
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dataset/nov19.csv"),
        }
    }
}

/// What an item gets when no local image can be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// External placeholder URL keyed by the food name.
    #[default]
    Placeholder,
    /// No image at all (`image_url: null`).
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Directory holding generated and copied images. Created on startup.
    pub dir: PathBuf,
    /// URL prefix the directory is served under.
    pub mount: String,
    pub fallback: Fallback,
    /// Placeholder URL template; `{query}` is replaced by the food name.
    pub placeholder_url: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("images"),
            mount: "/images".to_string(),
            fallback: Fallback::Placeholder,
            placeholder_url: "https://source.unsplash.com/400x400/?{query},food".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Master switch. Generation also needs `OPENAI_API_KEY`.
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible images API.
    pub api_base: String,
    pub model: String,
    pub size: String,
    /// Prompt template; `{food}` is replaced by the food name.
    pub prompt: String,
    /// Timeout in seconds for each HTTP request to the image API.
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "dall-e-2".to_string(),
            size: "256x256".to_string(),
            prompt: "A delicious, appetizing photo of {food} with a small wiscosin madison badge"
                .to_string(),
            timeout_secs: 60,
        }
    }
}

/// Parallel generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of concurrent generator calls.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Read the generator API key from the environment.
///
/// Blank values count as missing.
pub fn api_key_from_env() -> Option<String> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Some(key.trim().to_string()),
        _ => {
            warn!("{API_KEY_VAR} not set, image generation disabled");
            None
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServiceConfig::default()).expect("default config must serialize")
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
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// A missing file yields the stock defaults. User values are merged on top
/// of the defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        info!(path = %path.display(), "config file not found, using defaults");
    }
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Dining Catalog Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
port = 8000

# ---------------------------------------------------------------------------
# Food dataset
# ---------------------------------------------------------------------------
[dataset]
# CSV with columns: name, diningHall, calories, image_path.
# Missing cells are tolerated; non-numeric calories become 0.
path = "dataset/nov19.csv"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Generated images are cached here as <food>_<hall>.png.
dir = "images"

# URL prefix the images directory is served under.
mount = "/images"

# What an item gets when no local image exists and generation is unavailable:
#   "placeholder" -> external placeholder URL (see placeholder_url)
#   "none"        -> image_url is null
fallback = "placeholder"

# {query} is replaced by the food name with spaces turned into '+'.
placeholder_url = "https://source.unsplash.com/400x400/?{query},food"

# ---------------------------------------------------------------------------
# Image generator
# ---------------------------------------------------------------------------
[generator]
# Generation also requires the OPENAI_API_KEY environment variable.
enabled = true
api_base = "https://api.openai.com/v1"
model = "dall-e-2"
size = "256x256"

# {food} is replaced by the food name.
prompt = "A delicious, appetizing photo of {food} with a small wiscosin madison badge"

# Timeout in seconds for each HTTP request to the image API.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum concurrent generator calls.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4
"##
}
