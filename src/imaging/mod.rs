//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Crop** | bounds check + `DynamicImage::crop_imm` |
//! | **Resize** | `DynamicImage::resize_exact`, bilinear (`Triangle`) |
//! | **Convert** | extension bookkeeping; encoding deferred to the store |
//! | **Load / Save** | [`FsStore`] via `image::ImageReader` and per-format encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Parameters**: Typed per-kind action parameters and their decoding
//! - **Operations**: [`Operation`] trait + crop/resize/convert transforms
//! - **Formats**: [`OutputFormat`] and the [`Extension`] the pipeline carries
//! - **Store**: [`ImageStore`] trait + [`FsStore`]

mod calculations;
pub mod format;
pub mod fs_store;
pub mod operations;
pub mod params;
pub mod store;

pub use calculations::rect_within;
pub use format::{Extension, OutputFormat, UnknownFormat};
pub use fs_store::FsStore;
pub use operations::{
    DEFAULT_MAX_DIMENSION, DEFAULT_MAX_PIXELS, Operation, StepOutput, TransformError, TransformSettings, convert,
    crop, resize, resize_target,
};
pub use params::{ActionKind, ActionParams, ConvertParams, CropParams, ResizeParams};
pub use store::{ImageStore, StoreError};
