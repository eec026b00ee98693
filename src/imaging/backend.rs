//! Label stamping trait and shared error type.
//!
//! The [`LabelStamper`] trait is the only operation the label pass needs
//! from an imaging backend: write the composed label onto a label image.
//!
//! The production implementation is
//! [`RasterStamper`](super::rust_backend::RasterStamper), pure Rust on top of
//! the `image` crate.

use super::params::StampRequest;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("label is {height}px tall, not enough for a {band}px text band")]
    TooSmall { height: u32, band: u32 },
}

/// Writes label text onto an image, in place.
pub trait LabelStamper: Sync {
    fn stamp(&self, request: &StampRequest) -> Result<(), StampError>;
}
