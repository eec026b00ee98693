//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `stitchflow.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of keys on top.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [owners]
//! labels = ["A", "B", "C", "D"]   # closed owner bucket set
//! weights = [1.0, 1.0, 0.7, 0.2]  # relative capacity per owner
//! strategy = "balanced"           # balanced | directory | fixed
//! fixed = "A"                     # owner used by strategy = "fixed"
//!
//! [naming]
//! month_codes = "abcdefghijkl"    # a = January … l = December
//! single_code = "S"
//! extension = "dst"
//!
//! [estimate]
//! stitches_per_minute = 800.0
//! color_change_seconds = 120.0
//! trim_seconds = 3.0
//! jump_seconds = 0.2
//! duplicate_reduction_seconds = 300.0
//!
//! [labels]
//! separator = " | "
//! band_height = 32
//! margin_left = 11
//! margin_top = 2
//! scale = 2
//! letter_spacing = 3
//! names_per_line = 2
//! bold = true
//!
//! [converter]
//! program = "libembroidery-convert"
//! args = ["{input}", "{output}"]
//!
//! [processing]
//! max_processes = 4               # omit for auto = CPU cores
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [owners]
//! strategy = "fixed"
//! fixed = "C"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming::{
    DEFAULT_EXTENSION, DEFAULT_MONTH_CODES, DEFAULT_SINGLE_CODE, FilenameCodec, SchemeError,
};
use crate::types::OwnerBucket;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "stitchflow.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

impl From<SchemeError> for ConfigError {
    fn from(e: SchemeError) -> Self {
        ConfigError::Validation(e.0)
    }
}

/// Pipeline configuration loaded from `stitchflow.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    /// Owner buckets and the rule that assigns new designs to them.
    pub owners: OwnersConfig,
    /// Export filename scheme.
    pub naming: NamingConfig,
    /// Stitch time estimation, used by balanced assignment.
    pub estimate: EstimateConfig,
    /// Label text layout and stamping.
    pub labels: LabelsConfig,
    /// External stitch format converter.
    pub converter: ConverterConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl FlowConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let owners = self.owners.buckets()?;
        if self.owners.weights.len() != owners.len() {
            return Err(ConfigError::Validation(format!(
                "owners.weights has {} entries but owners.labels has {}",
                self.owners.weights.len(),
                owners.len()
            )));
        }
        if self.owners.weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ConfigError::Validation(
                "owners.weights must all be positive".into(),
            ));
        }
        if self.owners.strategy == AssignStrategy::Fixed
            && !self.owners.labels.contains(&self.owners.fixed)
        {
            return Err(ConfigError::Validation(format!(
                "owners.fixed '{}' is not one of owners.labels",
                self.owners.fixed
            )));
        }

        // Scheme rules (month alphabet, single code, extension) live in naming.
        self.codec()?;

        if self.estimate.stitches_per_minute <= 0.0 {
            return Err(ConfigError::Validation(
                "estimate.stitches_per_minute must be positive".into(),
            ));
        }
        if self.labels.band_height == 0 {
            return Err(ConfigError::Validation(
                "labels.band_height must be non-zero".into(),
            ));
        }
        if self.labels.scale == 0 {
            return Err(ConfigError::Validation(
                "labels.scale must be non-zero".into(),
            ));
        }
        if self.labels.names_per_line == 0 {
            return Err(ConfigError::Validation(
                "labels.names_per_line must be non-zero".into(),
            ));
        }
        if self.converter.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "converter.program must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Filename codec for the configured scheme.
    pub fn codec(&self) -> Result<FilenameCodec, ConfigError> {
        let owners = self.owners.buckets()?;
        let mut single = self.naming.single_code.chars();
        let single_code = match (single.next(), single.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(ConfigError::Validation(format!(
                    "naming.single_code '{}' must be one character",
                    self.naming.single_code
                )));
            }
        };
        Ok(FilenameCodec::new(
            &owners,
            &self.naming.month_codes,
            single_code,
            &self.naming.extension,
        )?)
    }
}

/// How the classify pass picks an owner for a design it has never seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignStrategy {
    /// Spread estimated stitch time across owners by weight.
    #[default]
    Balanced,
    /// Use the first directory under the design dir when it names an owner.
    Directory,
    /// Everything goes to `owners.fixed`.
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OwnersConfig {
    pub labels: Vec<String>,
    pub weights: Vec<f64>,
    pub strategy: AssignStrategy,
    pub fixed: String,
}

impl Default for OwnersConfig {
    fn default() -> Self {
        Self {
            labels: ["A", "B", "C", "D"].map(String::from).to_vec(),
            weights: vec![1.0, 1.0, 0.7, 0.2],
            strategy: AssignStrategy::Balanced,
            fixed: "A".to_string(),
        }
    }
}

impl OwnersConfig {
    /// Parse the labels into owner buckets, rejecting duplicates.
    pub fn buckets(&self) -> Result<Vec<OwnerBucket>, ConfigError> {
        if self.labels.is_empty() {
            return Err(ConfigError::Validation(
                "owners.labels must not be empty".into(),
            ));
        }
        let mut buckets = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            let bucket = OwnerBucket::try_from(label.clone())
                .map_err(|e| ConfigError::Validation(format!("owners.labels: {e}")))?;
            if buckets.contains(&bucket) {
                return Err(ConfigError::Validation(format!(
                    "owners.labels lists '{label}' twice"
                )));
            }
            buckets.push(bucket);
        }
        Ok(buckets)
    }

    /// Owner for the `fixed` strategy.
    pub fn fixed_bucket(&self) -> Result<OwnerBucket, ConfigError> {
        OwnerBucket::try_from(self.fixed.clone())
            .map_err(|e| ConfigError::Validation(format!("owners.fixed: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub month_codes: String,
    pub single_code: String,
    pub extension: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            month_codes: DEFAULT_MONTH_CODES.to_string(),
            single_code: DEFAULT_SINGLE_CODE.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// Machine time model. Durations in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimateConfig {
    pub stitches_per_minute: f64,
    pub color_change_seconds: f64,
    pub trim_seconds: f64,
    pub jump_seconds: f64,
    /// Saved per extra copy of the same design (no re-threading).
    pub duplicate_reduction_seconds: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            stitches_per_minute: 800.0,
            color_change_seconds: 120.0,
            trim_seconds: 3.0,
            jump_seconds: 0.2,
            duplicate_reduction_seconds: 300.0,
        }
    }
}

/// Label text layout. Pixel values refer to the source label image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelsConfig {
    /// Joins the export names of a multi-face design.
    pub separator: String,
    /// Height of the blank band opened at the top for the text.
    pub band_height: u32,
    pub margin_left: u32,
    pub margin_top: u32,
    /// Pixel scale of the built-in glyphs.
    pub scale: u32,
    /// Extra pixels between glyphs.
    pub letter_spacing: u32,
    pub names_per_line: usize,
    pub bold: bool,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            separator: " | ".to_string(),
            band_height: 32,
            margin_left: 11,
            margin_top: 2,
            scale: 2,
            letter_spacing: 3,
            names_per_line: 2,
            bold: true,
        }
    }
}

/// External program turning a design file into a machine stitch file.
///
/// `{input}` and `{output}` in `args` are replaced with the file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "libembroidery-convert".to_string(),
            args: vec!["{input}".to_string(), "{output}".to_string()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel conversion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(FlowConfig::default())?)
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

/// Read a config file as a raw TOML value.
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

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<FlowConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: FlowConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<FlowConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Commented stock config, printed by `stitchflow gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# stitchflow configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Owner buckets
# ---------------------------------------------------------------------------
[owners]
# Closed set of owner buckets. Each is a single uppercase letter and appears
# in every export file name, so changing it invalidates the export registry.
labels = ["A", "B", "C", "D"]

# Relative capacity per owner, same order as labels. Used by "balanced".
weights = [1.0, 1.0, 0.7, 0.2]

# How designs seen for the first time get an owner:
#   balanced  - spread estimated stitch time across owners by weight
#   directory - first folder under the design dir, when it names an owner
#   fixed     - always the owner below
strategy = "balanced"
fixed = "A"

# ---------------------------------------------------------------------------
# Export file names (055A3F09j.dst)
# ---------------------------------------------------------------------------
[naming]
# Twelve distinct lowercase letters, January first.
month_codes = "abcdefghijkl"

# Position code for single-face designs. Must not be F, L or R.
single_code = "S"

extension = "dst"

# ---------------------------------------------------------------------------
# Stitch time estimation (seconds)
# ---------------------------------------------------------------------------
[estimate]
stitches_per_minute = 800.0
color_change_seconds = 120.0
trim_seconds = 3.0
jump_seconds = 0.2
# Saved for every extra garment carrying the same design.
duplicate_reduction_seconds = 300.0

# ---------------------------------------------------------------------------
# Label stamping
# ---------------------------------------------------------------------------
[labels]
# Joins the names of a multi-face design: "055A3F09j | 055A3L09j".
separator = " | "

# The label content is shifted down by this many pixels to make room for text.
band_height = 32
margin_left = 11
margin_top = 2

# Glyph pixel scale and extra spacing between glyphs.
scale = 2
letter_spacing = 3

# Names per text line; longer designs wrap.
names_per_line = 2

# Draw the text twice, offset by one pixel.
bold = true

# ---------------------------------------------------------------------------
# Stitch format converter
# ---------------------------------------------------------------------------
[converter]
# External program invoked once per face. {input} and {output} are replaced
# with the design file and the target .dst path.
program = "libembroidery-convert"
args = ["{input}", "{output}"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversion workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
