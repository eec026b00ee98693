//! Label imaging: pure Rust, on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image::open`, `DynamicImage::write_to` |
//! | **Open text band** | `imageops::crop_imm` + `imageops::replace` |
//! | **Draw text** | built-in 5×7 bitmap font ([`glyphs`]) |
//!
//! The module is split into:
//! - **Calculations**: pure layout functions (label wrapping, widths)
//! - **Parameters**: what to stamp ([`StampRequest`]) and how ([`TextStyle`])
//! - **Backend**: [`LabelStamper`] trait + [`RasterStamper`]

pub mod backend;
mod calculations;
pub mod glyphs;
mod params;
pub mod rust_backend;

pub use backend::{LabelStamper, StampError};
pub use calculations::wrap_label;
pub use params::{StampRequest, TextStyle};
pub use rust_backend::RasterStamper;
