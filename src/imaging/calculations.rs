//! Pure layout functions for label text.
//!
//! All functions here are pure and testable without any I/O or images.

use super::glyphs::{GLYPH_HEIGHT, GLYPH_WIDTH};

/// Wrap a composed label into text lines, breaking at every `per_line`-th
/// `separator`. The separator at a break is dropped.
///
/// ```text
/// "055A3F09j | 055A3L09j | 055A3R09j", " | ", 2
///   → ["055A3F09j | 055A3L09j", "055A3R09j"]
/// ```
pub fn wrap_label(label: &str, separator: &str, per_line: usize) -> Vec<String> {
    if label.is_empty() {
        return Vec::new();
    }
    if separator.is_empty() {
        return vec![label.to_string()];
    }
    let parts: Vec<&str> = label.split(separator).collect();
    parts
        .chunks(per_line.max(1))
        .map(|chunk| chunk.join(separator))
        .collect()
}

/// Horizontal distance from one glyph's left edge to the next.
pub fn glyph_advance(scale: u32, letter_spacing: u32) -> u32 {
    GLYPH_WIDTH * scale + letter_spacing
}

/// Width in pixels of a rendered line, without trailing spacing.
pub fn text_width(text: &str, scale: u32, letter_spacing: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0;
    }
    n * glyph_advance(scale, letter_spacing) - letter_spacing
}

/// Vertical distance between the tops of consecutive lines.
pub fn line_height(scale: u32) -> u32 {
    (GLYPH_HEIGHT + 2) * scale
}

/// Top-left pixel of every line.
pub fn line_origins(lines: usize, margin_left: u32, margin_top: u32, scale: u32) -> Vec<(u32, u32)> {
    (0..lines as u32)
        .map(|i| (margin_left, margin_top + i * line_height(scale)))
        .collect()
}
