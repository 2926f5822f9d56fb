//! Shared test utilities for the photo-editor test suite.
//!
//! Synthetic images are deterministic gradients, so two calls with the same
//! size produce byte-identical buffers and golden comparisons are stable.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let state = gradient_state(100, 80, "jpg");
//! let store = MockStore::with_image("cat.jpg", gradient_image(100, 80));
//! ```

use image::{DynamicImage, ImageEncoder, RgbImage};
use std::path::Path;

use crate::imaging::Extension;
use crate::pipeline::PipelineState;

/// Deterministic RGB gradient of the given size.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Pipeline state holding a gradient image and the given extension.
pub fn gradient_state(width: u32, height: u32, ext: &str) -> PipelineState {
    PipelineState::new(gradient_image(width, height), Extension::new(ext))
}

/// Write a small valid JPEG file with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient_image(width, height).to_rgb8();
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}
