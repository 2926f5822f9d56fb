//! Editor configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file overrides just the keys it sets.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! images_dir = "images"          # Where source images are looked up by name
//! output_dir = "processed"       # Where results are written
//! public_base_url = "/processed" # Prefix of the returned reference
//!
//! [limits]
//! max_actions = 5                # 1-5 actions per request
//! max_image_name_len = 100       # Characters
//! max_kind_len = 10              # Characters
//! max_dimension = 16384          # Largest side a resize may produce
//! max_pixels = 67108864          # Largest width x height a resize may produce
//!
//! [output]
//! name_prefix = "proc"           # Generated names look like proc_<token>.png
//! quality = 90                   # JPEG/AVIF quality (1-100)
//! formats = ["jpeg", "png", "webp", "tiff", "avif"]  # Convert targets
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::imaging::{DEFAULT_MAX_DIMENSION, DEFAULT_MAX_PIXELS, OutputFormat, TransformSettings};
use crate::request::{MAX_ACTIONS, MAX_IMAGE_NAME_LEN, MAX_KIND_LEN, RequestLimits};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Source and output locations.
    pub storage: StorageConfig,
    /// Request and transform limits.
    pub limits: LimitsConfig,
    /// Naming and encoding of results.
    pub output: OutputConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ACTIONS).contains(&self.limits.max_actions) {
            return Err(ConfigError::Validation(format!(
                "limits.max_actions must be 1-{MAX_ACTIONS}"
            )));
        }
        if !(1..=MAX_IMAGE_NAME_LEN).contains(&self.limits.max_image_name_len) {
            return Err(ConfigError::Validation(format!(
                "limits.max_image_name_len must be 1-{MAX_IMAGE_NAME_LEN}"
            )));
        }
        if !(1..=MAX_KIND_LEN).contains(&self.limits.max_kind_len) {
            return Err(ConfigError::Validation(format!(
                "limits.max_kind_len must be 1-{MAX_KIND_LEN}"
            )));
        }
        if self.limits.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "limits.max_dimension must be non-zero".into(),
            ));
        }
        if self.limits.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_pixels must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.formats.is_empty() {
            return Err(ConfigError::Validation(
                "output.formats must not be empty".into(),
            ));
        }
        let prefix = &self.output.name_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(
                "output.name_prefix must be non-empty and use only [A-Za-z0-9_-]".into(),
            ));
        }
        Ok(())
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_actions: self.limits.max_actions,
            max_image_name_len: self.limits.max_image_name_len,
            max_kind_len: self.limits.max_kind_len,
        }
    }

    pub fn transform_settings(&self) -> TransformSettings {
        TransformSettings {
            max_dimension: self.limits.max_dimension,
            max_pixels: self.limits.max_pixels,
            formats: self.output.formats.clone(),
        }
    }
}

/// Source and output locations for the filesystem store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory source images are looked up in by name.
    pub images_dir: PathBuf,
    /// Directory processed images are written to.
    pub output_dir: PathBuf,
    /// Prefix of the reference returned for a saved image.
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("processed"),
            public_base_url: "/processed".to_string(),
        }
    }
}

/// Request and transform limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum actions per request (at most 5).
    pub max_actions: usize,
    /// Maximum characters in `image_name` (at most 100).
    pub max_image_name_len: usize,
    /// Maximum characters in an action kind (at most 10).
    pub max_kind_len: usize,
    /// Largest width or height a resize may produce.
    pub max_dimension: u32,
    /// Largest `width * height` a resize may produce.
    pub max_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_actions: MAX_ACTIONS,
            max_image_name_len: MAX_IMAGE_NAME_LEN,
            max_kind_len: MAX_KIND_LEN,
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Naming and encoding of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Prefix of generated names.
    pub name_prefix: String,
    /// JPEG/AVIF encoding quality (1 = worst, 100 = best).
    pub quality: u8,
    /// Formats a convert action may target.
    pub formats: Vec<OutputFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name_prefix: "proc".to_string(),
            quality: 90,
            formats: OutputFormat::ALL.to_vec(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EditorConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
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

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<EditorConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Editor Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory source images are looked up in. Requests name a file directly
# inside it; subdirectories and ".." are not allowed.
images_dir = "images"

# Directory processed images are written to (created on first save).
output_dir = "processed"

# Prefix of the reference returned for each saved image.
# Use a full URL ("https://cdn.example.com/img") when serving from a CDN.
public_base_url = "/processed"

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Actions per request (1-5).
max_actions = 5

# Characters allowed in image_name (1-100).
max_image_name_len = 100

# Characters allowed in an action kind (1-10).
max_kind_len = 10

# Largest width or height a resize may produce, in pixels.
max_dimension = 16384

# Largest width x height a resize may produce (64 MiP, about 256 MiB of RGBA).
max_pixels = 67108864

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Generated names look like <prefix>_<32 hex chars><extension>.
name_prefix = "proc"

# JPEG/AVIF encoding quality (1 = worst, 100 = best).
quality = 90

# Formats a convert action may target.
# Supported: jpeg, png, webp, tiff, avif
formats = ["jpeg", "png", "webp", "tiff", "avif"]
"##
}
