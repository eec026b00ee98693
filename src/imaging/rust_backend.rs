//! Raster label stamper on the `image` crate.
//!
//! Label images come from the order system with content starting at the top
//! edge. Stamping opens a blank band above the content and writes the
//! composed label into it, wrapped after every `names_per_line` names:
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │ order label content  │        │ 055A3F09j | 055A3L09j│ ← band (band_height)
//! │                      │   →    │ 055A3R09j            │
//! │                      │        │ order label content  │
//! │ ....bottom margin....│        │                      │
//! └──────────────────────┘        └──────────────────────┘
//! ```
//!
//! The image keeps its size: `band_height` pixels are cropped off the bottom
//! and the rest moves down. The band is transparent for PNG output, white
//! for formats without alpha. The file is replaced atomically.

use super::backend::{LabelStamper, StampError};
use super::calculations::{glyph_advance, line_origins, text_width, wrap_label};
use super::glyphs::lit_pixels;
use super::params::{StampRequest, TextStyle};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pure Rust stamper using the `image` crate and the built-in glyphs.
#[derive(Debug, Clone, Default)]
pub struct RasterStamper {
    style: TextStyle,
}

impl RasterStamper {
    pub fn new(style: TextStyle) -> Self {
        Self { style }
    }

    /// Shift content down and draw `label` into the text band.
    pub fn render(&self, source: &RgbaImage, label: &str, background: Rgba<u8>) -> Result<RgbaImage, StampError> {
        let (width, height) = source.dimensions();
        let band = self.style.band_height;
        if height <= band {
            return Err(StampError::TooSmall { height, band });
        }

        let kept = imageops::crop_imm(source, 0, 0, width, height - band).to_image();
        let mut canvas = RgbaImage::from_pixel(width, height, background);
        imageops::replace(&mut canvas, &kept, 0, i64::from(band));

        let lines = wrap_label(label, &self.style.separator, self.style.names_per_line);
        let origins = line_origins(
            lines.len(),
            self.style.margin_left,
            self.style.margin_top,
            self.style.scale,
        );
        for (line, (x, y)) in lines.iter().zip(origins) {
            if x + text_width(line, self.style.scale, self.style.letter_spacing) > width {
                warn!(%line, width, "label text is wider than the image, clipping");
            }
            self.draw_line(&mut canvas, line, x, y);
            if self.style.bold {
                self.draw_line(&mut canvas, line, x + 1, y);
            }
        }
        Ok(canvas)
    }

    fn draw_line(&self, canvas: &mut RgbaImage, text: &str, x: u32, y: u32) {
        let scale = self.style.scale;
        let advance = glyph_advance(scale, self.style.letter_spacing);
        for (i, c) in text.chars().enumerate() {
            let left = x + i as u32 * advance;
            for (gx, gy) in lit_pixels(c) {
                fill_block(canvas, left + gx * scale, y + gy * scale, scale);
            }
        }
    }
}

/// Paint a `size`×`size` block, clipped to the canvas.
fn fill_block(canvas: &mut RgbaImage, x: u32, y: u32, size: u32) {
    let (width, height) = canvas.dimensions();
    for py in y..(y + size).min(height) {
        for px in x..(x + size).min(width) {
            canvas.put_pixel(px, py, INK);
        }
    }
}

fn keeps_alpha(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Png)
}

impl LabelStamper for RasterStamper {
    fn stamp(&self, request: &StampRequest) -> Result<(), StampError> {
        let path = &request.image;
        let format = ImageFormat::from_path(path)?;
        let source = image::open(path)?.to_rgba8();

        let background = if keeps_alpha(format) { TRANSPARENT } else { WHITE };
        let stamped = self.render(&source, &request.label, background)?;
        let output = if keeps_alpha(format) {
            DynamicImage::ImageRgba8(stamped)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(stamped).to_rgb8())
        };

        let dir = path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        output.write_to(&mut tmp, format)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
