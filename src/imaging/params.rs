//! Parameter types for label stamping.
//!
//! These structs describe *what* to draw, not *how*. They are the interface
//! between the label pass (which decides which names go on which image) and
//! the [`backend`](super::backend) (which does the pixel work), so tests can
//! swap in a mock stamper without changing the label logic.
//!
//! - [`StampRequest`]: target image plus the label text to write on it.
//! - [`TextStyle`]: layout of the text band, from `[labels]` in the config.

use crate::config::LabelsConfig;
use std::path::PathBuf;

/// Stamp `label` onto `image`, in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampRequest {
    pub image: PathBuf,
    /// The composed label. Drawn as is, wrapped at its separators.
    pub label: String,
}

/// Layout of the text band. All values in pixels of the source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    /// Where a long label may wrap.
    pub separator: String,
    pub band_height: u32,
    pub margin_left: u32,
    pub margin_top: u32,
    pub scale: u32,
    pub letter_spacing: u32,
    pub names_per_line: usize,
    pub bold: bool,
}

impl From<&LabelsConfig> for TextStyle {
    fn from(config: &LabelsConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            band_height: config.band_height,
            margin_left: config.margin_left,
            margin_top: config.margin_top,
            scale: config.scale.max(1),
            letter_spacing: config.letter_spacing,
            names_per_line: config.names_per_line.max(1),
            bold: config.bold,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::from(&LabelsConfig::default())
    }
}
